use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{EngineContext, EngineFactory};
use crate::observability::ENGINE_RESTARTS_TOTAL;

struct Run {
    generation: u64,
    task: JoinHandle<()>,
}

/// Owns the single engine run.
///
/// `restart` cancels the in-flight run and waits for it to wind down before
/// spawning the next one. Concurrent restarts queue on the same lock, so at
/// most one run exists at any time.
pub struct EngineSupervisor {
    factory: Arc<dyn EngineFactory>,
    ctx: EngineContext,
    current: Mutex<Option<Run>>,
    generation: AtomicU64,
}

impl EngineSupervisor {
    pub fn new(factory: Arc<dyn EngineFactory>, ctx: EngineContext) -> Arc<Self> {
        Arc::new(Self { factory, ctx, current: Mutex::new(None), generation: AtomicU64::new(0) })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Number of runs started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cancel any current run and start a new one; returns its generation.
    pub async fn restart(&self) -> u64 {
        let mut current = self.current.lock().await;
        if let Some(run) = current.take() {
            cancel(run).await;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let factory = Arc::clone(&self.factory);
        let ctx = self.ctx.clone();
        let task = tokio::spawn(async move {
            let result = async {
                let mut engine = factory.create().await?;
                engine.start(ctx).await
            }
            .await;
            match result {
                Ok(()) => info!(generation, "engine run finished"),
                Err(e) => error!(generation, error = %e, "engine run failed"),
            }
        });
        *current = Some(Run { generation, task });
        ENGINE_RESTARTS_TOTAL.inc();
        info!(generation, "engine run started");
        generation
    }

    /// Cancel the current run, if any.
    pub async fn stop(&self) {
        if let Some(run) = self.current.lock().await.take() {
            cancel(run).await;
        }
    }

    /// Wait for the current run to finish on its own.
    pub async fn join(&self) {
        let run = self.current.lock().await.take();
        if let Some(run) = run {
            if let Err(e) = run.task.await {
                warn!(generation = run.generation, error = %e, "engine run did not complete");
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.current.lock().await.as_ref().is_some_and(|run| !run.task.is_finished())
    }
}

async fn cancel(run: Run) {
    let Run { generation, task } = run;
    if !task.is_finished() {
        debug!(generation, "cancelling in-flight engine run");
        task.abort();
    }
    match task.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!(generation, "engine run cancelled"),
        Err(e) => warn!(generation, error = %e, "engine run panicked"),
    }
}
