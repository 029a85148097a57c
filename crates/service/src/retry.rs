use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::StorageError;

/// Errors that know whether another attempt could help.
pub trait Retryable: std::error::Error {
    fn is_retryable(&self) -> bool;
}

impl Retryable for StorageError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    enabled: bool,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        backoff_base: Duration,
        backoff_max: Duration,
        enabled: bool,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            backoff_max,
            enabled,
        }
    }

    pub fn from_config(cfg: &configs::RetryConfig) -> Self {
        Self::new(cfg.max_attempts, cfg.backoff_base(), cfg.backoff_max(), cfg.enabled)
    }

    /// Single attempt, no backoff.
    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, false)
    }

    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts
        } else {
            1
        }
    }

    /// Exponential backoff for the given retry number (1-based), capped at `backoff_max`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if !self.enabled || retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(retry - 1);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    pub fn should_retry<E: Retryable>(&self, attempt: u32, error: &E) -> bool {
        if !self.enabled {
            return false;
        }

        if attempt >= self.max_attempts {
            debug!(attempt, "max retry attempts reached");
            return false;
        }

        if error.is_retryable() {
            debug!(%error, "error is retryable");
            true
        } else {
            debug!(%error, "error is not retryable");
            false
        }
    }
}

pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                if !policy.should_retry(attempt, &error) {
                    return Err(error);
                }
                let wait = policy.backoff(attempt);
                let backoff_ms = wait.as_millis() as u64;
                warn!(attempt, %error, backoff_ms, "operation failed; retrying");
                sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
