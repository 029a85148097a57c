use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::StorageError;
use crate::observability::{STORAGE_FAILURES_TOTAL, STORAGE_OPS_TOTAL};
use crate::retry::{retry_with_policy, RetryPolicy};
use crate::storage::area::{Items, StorageArea};
use crate::storage::change::StorageChange;

/// Result-returning front for a storage area.
///
/// Every call is bounded by `op_timeout` per attempt and retried under the
/// retry policy when the failure is transient. Completion and failure are
/// both logged; failures are also returned to the caller.
#[derive(Clone)]
pub struct StorageGateway {
    area: Arc<dyn StorageArea>,
    retry: RetryPolicy,
    op_timeout: Duration,
}

impl StorageGateway {
    pub fn new(area: Arc<dyn StorageArea>, retry: RetryPolicy, op_timeout: Duration) -> Self {
        Self { area, retry, op_timeout }
    }

    pub fn from_config(area: Arc<dyn StorageArea>, cfg: &configs::AppConfig) -> Self {
        Self::new(area, RetryPolicy::from_config(&cfg.retry), cfg.storage.op_timeout())
    }

    /// Read `key`, or the whole area for `None`. Missing keys are not an error.
    pub async fn get(&self, key: Option<&str>) -> Result<Items, StorageError> {
        let items = self.run("get", key, || self.area.get(key)).await?;
        debug!(key = key.unwrap_or("*"), found = items.len(), "storage get");
        Ok(items)
    }

    /// Read one key's value.
    pub async fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut items = self.get(Some(key)).await?;
        Ok(items.remove(key))
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.run("set", Some(key), || self.area.set(key, value.clone())).await?;
        debug!(key, "storage set");
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.run("remove", Some(key), || self.area.remove(key)).await?;
        debug!(key, "storage remove");
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.area.subscribe()
    }

    async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        key: Option<&str>,
        mut call: F,
    ) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        STORAGE_OPS_TOTAL.with_label_values(&[op]).inc();
        let limit = self.op_timeout;
        let result = retry_with_policy(&self.retry, || {
            let attempt = call();
            async move {
                match timeout(limit, attempt).await {
                    Ok(result) => result,
                    Err(_) => {
                        Err(StorageError::Timeout { op, elapsed_ms: limit.as_millis() as u64 })
                    }
                }
            }
        })
        .await;

        if let Err(error) = &result {
            STORAGE_FAILURES_TOTAL.with_label_values(&[op]).inc();
            warn!(op, key = key.unwrap_or("*"), %error, "storage operation failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AreaName, LocalArea};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Area whose first `failures` writes fail or hang.
    struct FlakyArea {
        inner: Arc<LocalArea>,
        failures: u32,
        hang: bool,
        calls: AtomicU32,
    }

    #[async_trait]
    impl StorageArea for FlakyArea {
        fn name(&self) -> AreaName { self.inner.name() }

        async fn get(&self, key: Option<&str>) -> Result<Items, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                if self.hang {
                    std::future::pending::<()>().await;
                }
                return Err(StorageError::Unavailable("area busy".into()));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }

        fn subscribe(&self) -> broadcast::Receiver<StorageChange> { self.inner.subscribe() }
    }

    fn flaky(failures: u32, hang: bool) -> Arc<FlakyArea> {
        Arc::new(FlakyArea {
            inner: LocalArea::in_memory(AreaName::Local),
            failures,
            hang,
            calls: AtomicU32::new(0),
        })
    }

    fn retrying(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(2), true)
    }

    #[tokio::test]
    async fn missing_key_is_none() -> Result<(), anyhow::Error> {
        let gw = StorageGateway::new(
            LocalArea::in_memory(AreaName::Local),
            RetryPolicy::disabled(),
            Duration::from_secs(1),
        );
        assert_eq!(gw.get_value("formData").await?, None);
        assert!(gw.get(None).await?.is_empty());
        gw.remove("formData").await?;
        Ok(())
    }

    #[tokio::test]
    async fn retries_transient_failures() -> Result<(), anyhow::Error> {
        let area = flaky(2, false);
        let gw = StorageGateway::new(area.clone(), retrying(3), Duration::from_secs(1));
        gw.set("enabled", json!(true)).await?;
        assert_eq!(area.calls.load(Ordering::SeqCst), 3);
        assert_eq!(gw.get_value("enabled").await?, Some(json!(true)));
        Ok(())
    }

    #[tokio::test]
    async fn surfaces_failure_after_retries() {
        let area = flaky(5, false);
        let gw = StorageGateway::new(area.clone(), retrying(2), Duration::from_secs(1));
        let err = gw.set("enabled", json!(true)).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(area.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hung_operation_times_out() -> Result<(), anyhow::Error> {
        let area = flaky(1, true);
        let gw =
            StorageGateway::new(area.clone(), RetryPolicy::disabled(), Duration::from_millis(20));
        let mut rx = gw.subscribe();
        let err = gw.set("enabled", json!(true)).await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout { op: "set", .. }));
        // a timed-out write is not observed by readers or subscribers
        assert_eq!(gw.get_value("enabled").await?, None);
        assert!(rx.try_recv().is_err());

        // a retrying gateway gets past the hung attempt
        let area = flaky(1, true);
        let gw = StorageGateway::new(area.clone(), retrying(2), Duration::from_millis(20));
        gw.set("enabled", json!(false)).await?;
        assert_eq!(gw.get_value("enabled").await?, Some(json!(false)));
        Ok(())
    }

    #[tokio::test]
    async fn timed_out_file_write_is_all_or_nothing() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("gateway_timeout_{}", uuid::Uuid::new_v4()));
        let path = dir.join("local_storage.json");
        let area = LocalArea::open(&path, AreaName::Local).await?;
        area.set("blob", json!("x".repeat(8 << 20))).await?;
        let mut rx = area.subscribe();

        let gw =
            StorageGateway::new(area.clone(), RetryPolicy::disabled(), Duration::from_millis(1));
        let result = gw.set("enabled", json!(true)).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let reopened = LocalArea::open(&path, AreaName::Local).await?;
        let on_disk = reopened.get(Some("enabled")).await?.remove("enabled");
        let in_memory = gw.get_value("enabled").await?;
        match result {
            Err(StorageError::Timeout { .. }) => {
                assert_eq!(in_memory, None);
                assert_eq!(on_disk, None);
                assert!(rx.try_recv().is_err());
            }
            Ok(()) => {
                assert_eq!(in_memory, Some(json!(true)));
                assert_eq!(on_disk, Some(json!(true)));
                assert!(rx.try_recv()?.touches("enabled"));
            }
            Err(other) => panic!("unexpected error: {other}"),
        }

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
