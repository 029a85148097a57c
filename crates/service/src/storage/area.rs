use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::errors::StorageError;
use crate::storage::change::StorageChange;

/// Key -> value pairs returned by a read. Absent keys are simply missing.
pub type Items = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaName {
    Local,
    Sync,
    Managed,
    Session,
}

impl AreaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sync => "sync",
            Self::Managed => "managed",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for AreaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaName {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "sync" => Ok(Self::Sync),
            "managed" => Ok(Self::Managed),
            "session" => Ok(Self::Session),
            _ => Err(StorageError::Unavailable(format!("unknown storage area: {s}"))),
        }
    }
}

/// Trait abstraction for a key-value storage area.
/// Implementations can be file-backed, in-memory, or bridged to a host runtime.
#[async_trait]
pub trait StorageArea: Send + Sync {
    fn name(&self) -> AreaName;

    /// Values under `key`, or every entry when `key` is `None`.
    async fn get(&self, key: Option<&str>) -> Result<Items, StorageError>;

    /// Replace whatever is stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Delete `key`; succeeds when it is already absent.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Change notifications emitted after each committed mutation.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}
