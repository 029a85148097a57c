use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use models::{page_key, FormField};
use serde_json::json;
use service::bootstrap;
use service::engine::{CaptureEngine, EngineContext, EngineFactory, EngineSupervisor};
use service::errors::EngineError;
use service::merge::MergePolicy;
use service::retry::RetryPolicy;
use service::storage::{AreaName, LocalArea, StorageGateway};
use service::toggle::ToggleController;

/// Captures one field when enabled and then stays attached until cancelled.
struct FormEngine {
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl CaptureEngine for FormEngine {
    async fn start(&mut self, ctx: EngineContext) -> Result<(), EngineError> {
        if !ctx.is_enabled().await? {
            self.log.lock().unwrap().push("idle");
            return Ok(());
        }
        let key = page_key("https://example.com/signup?step=2")
            .map_err(|e| EngineError::Failed(e.to_string()))?;
        ctx.save(&key, FormField::new("email", "a@b.com").into()).await?;
        self.log.lock().unwrap().push("capturing");
        std::future::pending::<()>().await;
        Ok(())
    }
}

struct FormEngineFactory {
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl EngineFactory for FormEngineFactory {
    async fn create(&self) -> Result<Box<dyn CaptureEngine>, EngineError> {
        Ok(Box::new(FormEngine { log: Arc::clone(&self.log) }))
    }
}

async fn wait_for_runs(supervisor: &EngineSupervisor, log: &Mutex<Vec<&'static str>>, runs: usize) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while log.lock().unwrap().len() < runs || supervisor.generation() < runs as u64 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "engine did not reach {runs} runs: {:?}", log.lock().unwrap());
}

fn context() -> EngineContext {
    let gw = StorageGateway::new(
        LocalArea::in_memory(AreaName::Local),
        RetryPolicy::disabled(),
        Duration::from_secs(1),
    );
    EngineContext::new(MergePolicy::new(gw))
}

#[tokio::test]
async fn flag_changes_restart_the_engine() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let ctx = context();
    let popup = ToggleController::with_default_hidden(ctx.policy().clone());
    let factory = Arc::new(FormEngineFactory { log: Arc::clone(&log) });
    let runtime = bootstrap::start(factory, ctx.clone()).await;

    // disabled by default: first run idles
    wait_for_runs(runtime.supervisor(), &log, 1).await;
    assert_eq!(*log.lock().unwrap(), vec!["idle"]);

    // enabling restarts the engine, which captures
    popup.toggle(true).write.await??;
    wait_for_runs(runtime.supervisor(), &log, 2).await;
    assert_eq!(log.lock().unwrap()[1], "capturing");
    let record = ctx.load_aggregate("https://example.com/signup").await?;
    assert_eq!(record.get("email"), Some(&json!("a@b.com")));
    assert!(runtime.supervisor().is_running().await);

    // disabling cancels the attached run and restarts idle
    popup.toggle(false).write.await??;
    wait_for_runs(runtime.supervisor(), &log, 3).await;
    assert_eq!(log.lock().unwrap()[2], "idle");
    assert!(!runtime.supervisor().is_running().await);

    // writes to other keys never restart
    ctx.save("url", vec![json!("https://example.com/signup")].into()).await?;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(runtime.supervisor().generation(), 3);

    runtime.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn rewriting_the_same_flag_value_still_restarts() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let ctx = context();
    let popup = ToggleController::with_default_hidden(ctx.policy().clone());
    let factory = Arc::new(FormEngineFactory { log: Arc::clone(&log) });
    let runtime = bootstrap::start(factory, ctx).await;
    wait_for_runs(runtime.supervisor(), &log, 1).await;

    popup.toggle(false).write.await??;
    wait_for_runs(runtime.supervisor(), &log, 2).await;
    assert_eq!(*log.lock().unwrap(), vec!["idle", "idle"]);

    runtime.shutdown().await;
    Ok(())
}
