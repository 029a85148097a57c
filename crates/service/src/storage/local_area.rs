use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::{fs, sync::{broadcast, RwLock}};
use tracing::debug;

use crate::errors::StorageError;
use crate::storage::area::{AreaName, Items, StorageArea};
use crate::storage::change::StorageChange;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Local storage area: an ordered JSON map, optionally mirrored to a file.
///
/// Each mutation is applied to a copy of the map, staged to a uniquely named
/// temp file and renamed over the data file while the write lock is held.
/// Only then is the copy swapped in and the change announced. The rename,
/// swap and notification happen without an await in between, so a mutation
/// whose future is dropped (timeout, task abort) either lands completely or
/// leaves memory, disk and subscribers untouched.
pub struct LocalArea {
    name: AreaName,
    inner: RwLock<Items>,
    file_path: Option<PathBuf>,
    changes: broadcast::Sender<StorageChange>,
}

impl LocalArea {
    pub fn in_memory(name: AreaName) -> Arc<Self> {
        Arc::new(Self::with_items(name, Items::new(), None))
    }

    /// Open a file-backed area. Creates the file with an empty object if missing.
    pub async fn open<P: Into<PathBuf>>(
        path: P,
        name: AreaName,
    ) -> Result<Arc<Self>, StorageError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let items: Items = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Items::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Items::new();
                write_atomically(&file_path, &empty).await?;
                empty
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %file_path.display(), keys = items.len(), "opened local storage area");

        Ok(Arc::new(Self::with_items(name, items, Some(file_path))))
    }

    fn with_items(name: AreaName, items: Items, file_path: Option<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { name, inner: RwLock::new(items), file_path, changes }
    }

    async fn persist(&self, items: &Items) -> Result<(), StorageError> {
        match &self.file_path {
            Some(path) => write_atomically(path, items).await,
            None => Ok(()),
        }
    }

    fn notify(&self, change: StorageChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

async fn write_atomically(path: &Path, items: &Items) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(items)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, data).await?;
    // Must stay synchronous: callers swap the in-memory map right after this
    // returns, with no await in between.
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl StorageArea for LocalArea {
    fn name(&self) -> AreaName {
        self.name
    }

    async fn get(&self, key: Option<&str>) -> Result<Items, StorageError> {
        let map = self.inner.read().await;
        Ok(match key {
            Some(key) => map.get(key).map(|v| (key.to_string(), v.clone())).into_iter().collect(),
            None => map.clone(),
        })
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        let old_value = next.insert(key.to_string(), value.clone());
        self.persist(&next).await?;
        *map = next;
        drop(map);
        self.notify(StorageChange::single(self.name, key, old_value, Some(value)));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.inner.write().await;
        if !map.contains_key(key) {
            return Ok(());
        }
        let mut next = map.clone();
        let old_value = next.remove(key);
        self.persist(&next).await?;
        *map = next;
        drop(map);
        self.notify(StorageChange::single(self.name, key, old_value, None));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
