use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage operation `{op}` timed out after {elapsed_ms}ms")]
    Timeout { op: &'static str, elapsed_ms: u64 },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl StorageError {
    /// I/O hiccups, timeouts and unavailability may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout { .. } | Self::Unavailable(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self { Self::Serialization(e.to_string()) }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("engine failed: {0}")]
    Failed(String),
}
