//! Environment/runtime helpers
//!
//! Sanity checks to ensure the storage directory exists at startup.

use std::path::Path;
use tracing::warn;

/// Create the parent directory of the storage file; in-memory storage needs nothing.
pub async fn ensure_storage_dir(storage_path: &str) -> anyhow::Result<()> {
    if storage_path.is_empty() {
        warn!("storage path is empty; captured data will not survive a restart");
        return Ok(());
    }
    let Some(parent) = Path::new(storage_path).parent() else { return Ok(()) };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_parent() -> anyhow::Result<()> {
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("auto_stash_env_{pid}"));
        let file = dir.join("nested").join("store.json");
        ensure_storage_dir(file.to_str().unwrap()).await?;
        assert!(tokio::fs::metadata(dir.join("nested")).await.is_ok());
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn empty_path_is_in_memory() -> anyhow::Result<()> {
        ensure_storage_dir("").await?;
        ensure_storage_dir("store.json").await?;
        Ok(())
    }
}
