//! Wiring: open the area, build the engine context, start engine + listener.

use std::sync::Arc;

use tracing::info;

use crate::engine::{EngineContext, EngineFactory, EngineSupervisor};
use crate::errors::StorageError;
use crate::listener::{ChangeListener, ListenerHandle};
use crate::merge::MergePolicy;
use crate::storage::{AreaName, LocalArea, StorageArea, StorageGateway};

/// Open the configured storage area: file-backed when a path is set, else in memory.
pub async fn open_area(cfg: &configs::StorageConfig) -> Result<Arc<dyn StorageArea>, StorageError> {
    let name: AreaName = cfg.area.parse()?;
    if cfg.is_persistent() {
        let area = LocalArea::open(&cfg.path, name).await?;
        info!(path = %cfg.path, area = %name, "storage area opened");
        Ok(area)
    } else {
        info!(area = %name, "using in-memory storage area");
        Ok(LocalArea::in_memory(name))
    }
}

pub async fn build_context(cfg: &configs::AppConfig) -> Result<EngineContext, StorageError> {
    let area = open_area(&cfg.storage).await?;
    let gateway = StorageGateway::from_config(area, cfg);
    Ok(EngineContext::new(MergePolicy::new(gateway)))
}

/// Running engine plus its change listener.
pub struct Runtime {
    supervisor: Arc<EngineSupervisor>,
    listener: ListenerHandle,
}

impl Runtime {
    pub fn supervisor(&self) -> &Arc<EngineSupervisor> {
        &self.supervisor
    }

    /// Stop listening first so no restart races the final cancel.
    pub async fn shutdown(self) {
        self.listener.shutdown().await;
        self.supervisor.stop().await;
        info!(runs = self.supervisor.generation(), "capture runtime stopped");
    }
}

/// Subscribe to changes, then start the first engine run.
pub async fn start(factory: Arc<dyn EngineFactory>, ctx: EngineContext) -> Runtime {
    let changes = ctx.gateway().subscribe();
    let supervisor = EngineSupervisor::new(factory, ctx);
    let listener = ChangeListener::new(Arc::clone(&supervisor)).spawn(changes);
    supervisor.restart().await;
    Runtime { supervisor, listener }
}
