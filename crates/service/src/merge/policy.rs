use models::{AggregateRecord, Capture};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::StorageError;
use crate::merge::key_locks::KeyLocks;
use crate::observability::MERGES_TOTAL;
use crate::storage::StorageGateway;

/// Decides how a captured value lands in storage.
///
/// The target key is always the caller's key. Snapshots and flags replace
/// the stored value; fields are merged into the aggregate record under the
/// key. All writes to one key, including clears, run under that key's lock,
/// so concurrent merges are linearized. Writes that bypass the policy and go
/// straight to the gateway are not serialized.
#[derive(Clone)]
pub struct MergePolicy {
    gateway: StorageGateway,
    locks: KeyLocks,
}

impl MergePolicy {
    pub fn new(gateway: StorageGateway) -> Self {
        Self { gateway, locks: KeyLocks::new() }
    }

    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    #[instrument(skip(self, capture), fields(kind = capture.kind()))]
    pub async fn save(&self, key: &str, capture: Capture) -> Result<(), StorageError> {
        let kind = capture.kind();
        let guard = self.locks.lock(key).await;
        let result = self.write_locked(key, capture).await;
        drop(guard);
        self.locks.prune();
        result?;
        MERGES_TOTAL.with_label_values(&[kind]).inc();
        Ok(())
    }

    /// Classify an untyped value by shape, then save it.
    pub async fn save_value(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let capture = Capture::from_value(value)?;
        self.save(key, capture).await
    }

    /// Fire-and-forget save: failures are logged and the capture is dropped.
    pub async fn persist(&self, key: &str, capture: Capture) {
        let kind = capture.kind();
        if let Err(error) = self.save(key, capture).await {
            warn!(key, kind, %error, "skipping capture after storage failure");
        }
    }

    /// Current aggregate under `key`; empty when absent.
    pub async fn load_aggregate(&self, key: &str) -> Result<AggregateRecord, StorageError> {
        self.read_aggregate(key).await
    }

    /// Remove `key` under its lock.
    pub async fn clear(&self, key: &str) -> Result<(), StorageError> {
        let guard = self.locks.lock(key).await;
        let result = self.gateway.remove(key).await;
        drop(guard);
        self.locks.prune();
        result
    }

    async fn write_locked(&self, key: &str, capture: Capture) -> Result<(), StorageError> {
        match capture {
            Capture::Snapshot(items) => {
                let len = items.len();
                self.gateway.set(key, Value::Array(items)).await?;
                debug!(len, "saved snapshot");
            }
            Capture::Flag(flag) => {
                self.gateway.set(key, Value::Bool(flag)).await?;
                debug!(flag, "saved flag");
            }
            Capture::Field(field) => {
                field.validate()?;
                let mut record = self.read_aggregate(key).await?;
                let name = field.name.clone();
                record.merge(field);
                self.gateway.set(key, record.into_value()).await?;
                debug!(field = %name, "saved field");
            }
        }
        Ok(())
    }

    async fn read_aggregate(&self, key: &str) -> Result<AggregateRecord, StorageError> {
        match self.gateway.get_value(key).await? {
            None => Ok(AggregateRecord::new()),
            Some(value @ Value::Object(_)) => Ok(AggregateRecord::from_value(value)?),
            Some(other) => {
                // A snapshot or flag under the same key; the aggregate starts over.
                warn!(
                    key,
                    found = %other,
                    "stored value is not an aggregate; starting a new record"
                );
                Ok(AggregateRecord::new())
            }
        }
    }
}
