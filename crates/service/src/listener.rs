use std::sync::Arc;

use models::keys::ENABLED_KEY;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::engine::EngineSupervisor;
use crate::storage::{AreaName, StorageChange};

/// Restarts the capture engine whenever the enabled flag changes in the local area.
///
/// The direction of the change does not matter: the engine reads the flag
/// itself and decides whether to capture or stay idle.
pub struct ChangeListener {
    supervisor: Arc<EngineSupervisor>,
    area: AreaName,
    flag_key: String,
}

impl ChangeListener {
    pub fn new(supervisor: Arc<EngineSupervisor>) -> Self {
        Self { supervisor, area: AreaName::Local, flag_key: ENABLED_KEY.to_string() }
    }

    pub fn is_relevant(&self, change: &StorageChange) -> bool {
        change.area == self.area && change.touches(&self.flag_key)
    }

    /// Handle one notification; returns whether a restart was issued.
    pub async fn on_change(&self, change: &StorageChange) -> bool {
        if !self.is_relevant(change) {
            trace!(area = %change.area, keys = change.changes.len(), "ignoring storage change");
            return false;
        }
        if let Some(flag) = change.changes.get(&self.flag_key) {
            info!(
                old = ?flag.old_value,
                new = ?flag.new_value,
                "enabled flag changed; restarting engine"
            );
        }
        self.supervisor.restart().await;
        true
    }

    /// Consume notifications from `rx` on a background task.
    ///
    /// Subscribe before the first write you want observed: a receiver only
    /// sees changes sent after it was created.
    pub fn spawn(self, mut rx: broadcast::Receiver<StorageChange>) -> ListenerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("change listener shutting down");
                        break;
                    }
                    received = rx.recv() => {
                        match received {
                            Ok(change) => {
                                self.on_change(&change).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                // The flag may have been among the dropped notifications.
                                warn!(skipped, "change listener lagged; restarting engine");
                                self.supervisor.restart().await;
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!("storage area closed; change listener exiting");
                                break;
                            }
                        }
                    }
                }
            }
        });
        ListenerHandle { shutdown: Some(shutdown_tx), task }
    }
}

pub struct ListenerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "change listener task failed");
        }
    }
}
