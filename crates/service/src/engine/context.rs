use models::{keys::ENABLED_KEY, AggregateRecord, Capture};

use crate::errors::StorageError;
use crate::merge::MergePolicy;
use crate::storage::StorageGateway;

/// Everything an engine run may touch, passed in explicitly.
#[derive(Clone)]
pub struct EngineContext {
    policy: MergePolicy,
}

impl EngineContext {
    pub fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    pub fn gateway(&self) -> &StorageGateway {
        self.policy.gateway()
    }

    /// The enabled flag; absent or non-boolean reads as `false`.
    pub async fn is_enabled(&self) -> Result<bool, StorageError> {
        let value = self.gateway().get_value(ENABLED_KEY).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    pub async fn save(&self, key: &str, capture: Capture) -> Result<(), StorageError> {
        self.policy.save(key, capture).await
    }

    pub async fn load_aggregate(&self, key: &str) -> Result<AggregateRecord, StorageError> {
        self.policy.load_aggregate(key).await
    }

    pub async fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.policy.clear(key).await
    }
}
