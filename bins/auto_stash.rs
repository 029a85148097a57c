use std::sync::Arc;

use async_trait::async_trait;
use dotenvy::dotenv;
use models::{page_key, Capture};
use serde::Deserialize;
use serde_json::Value;
use service::engine::{CaptureEngine, EngineContext, EngineFactory};
use service::errors::EngineError;
use service::toggle::{EntryList, ToggleController};
use service::{bootstrap, observability};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One captured value read from stdin. `page` is turned into a page key;
/// otherwise `key` is used as given.
#[derive(Debug, Deserialize)]
struct CaptureLine {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    page: Option<String>,
    value: Value,
}

impl CaptureLine {
    fn target_key(&self) -> Result<String, EngineError> {
        match (&self.page, &self.key) {
            (Some(page), _) => page_key(page).map_err(|e| EngineError::Failed(e.to_string())),
            (None, Some(key)) => Ok(key.clone()),
            (None, None) => Err(EngineError::Failed("capture line needs `key` or `page`".into())),
        }
    }
}

type SharedLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Replays JSON capture lines from stdin into storage while enabled.
struct ReplayEngine {
    lines: SharedLines,
    input_closed: Arc<Notify>,
}

#[async_trait]
impl CaptureEngine for ReplayEngine {
    async fn start(&mut self, ctx: EngineContext) -> Result<(), EngineError> {
        if !ctx.is_enabled().await? {
            info!("auto-save disabled; engine idle");
            return Ok(());
        }
        info!("auto-save enabled; replaying captures from stdin");
        loop {
            let next = self.lines.lock().await.next_line().await;
            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.input_closed.notify_one();
                    return Ok(());
                }
                Err(e) => return Err(EngineError::Failed(format!("stdin read failed: {e}"))),
            };
            if line.trim().is_empty() {
                continue;
            }
            let parsed: CaptureLine = match serde_json::from_str(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "skipping malformed capture line");
                    continue;
                }
            };
            let key = match parsed.target_key() {
                Ok(key) => key,
                Err(e) => {
                    warn!(error = %e, "skipping capture without a usable key");
                    continue;
                }
            };
            match Capture::from_value(parsed.value) {
                Ok(capture) => ctx.policy().persist(&key, capture).await,
                Err(e) => warn!(key = %key, error = %e, "skipping capture of unsupported shape"),
            }
            debug!(key = %key, "capture line handled");
        }
    }
}

struct ReplayFactory {
    lines: SharedLines,
    input_closed: Arc<Notify>,
}

#[async_trait]
impl EngineFactory for ReplayFactory {
    async fn create(&self) -> Result<Box<dyn CaptureEngine>, EngineError> {
        Ok(Box::new(ReplayEngine {
            lines: Arc::clone(&self.lines),
            input_closed: Arc::clone(&self.input_closed),
        }))
    }
}

fn load_config() -> configs::AppConfig {
    match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            let mut cfg = configs::AppConfig::default();
            // Defaults always validate; this only normalizes hidden keys.
            let _ = cfg.normalize_and_validate();
            eprintln!("config not loaded ({e}); using defaults");
            cfg
        }
    }
}

fn main() -> std::process::ExitCode {
    // Load .env early so RUST_LOG and CONFIG_PATH take effect
    dotenv().ok();
    let cfg = load_config();
    common::utils::logging::init_logging(match cfg.logging.format {
        configs::LogFormat::Json => "json",
        configs::LogFormat::Compact => "compact",
    });
    info!(service = "auto_stash", event = "logger_init", "tracing subscriber initialized");

    let instance_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "auto_stash",
            event = "panic",
            %instance_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(
                service = "auto_stash",
                event = "runtime_build_failed",
                error = %e,
                "failed to build tokio runtime"
            );
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "auto_stash",
        event = "start",
        %instance_id,
        pid,
        version,
        storage = %cfg.storage.path,
        "auto_stash starting"
    );

    rt.block_on(async move {
        match run(cfg).await {
            Ok(()) => {
                info!(
                    service = "auto_stash",
                    event = "stop",
                    %instance_id,
                    pid,
                    "auto_stash stopped"
                );
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                error!(
                    service = "auto_stash",
                    event = "run_failed",
                    error = %e,
                    "auto_stash failed"
                );
                std::process::ExitCode::FAILURE
            }
        }
    })
}

async fn run(cfg: configs::AppConfig) -> anyhow::Result<()> {
    common::env::ensure_storage_dir(&cfg.storage.path).await?;
    let ctx = bootstrap::build_context(&cfg).await?;

    let popup = ToggleController::from_config(ctx.policy().clone(), &cfg.popup);
    let view = popup.render().await;
    match &view.entries {
        EntryList::Placeholder(text) => info!(status = view.toggle.status, "{text}"),
        EntryList::Entries(entries) => {
            info!(
                status = view.toggle.status,
                saved = entries.len(),
                keys = ?view.entries.keys(),
                "stored entries"
            )
        }
    }

    let lines: SharedLines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let input_closed = Arc::new(Notify::new());
    let factory = Arc::new(ReplayFactory { lines, input_closed: Arc::clone(&input_closed) });
    let runtime = bootstrap::start(factory, ctx).await;

    tokio::select! {
        _ = input_closed.notified() => {
            info!(service = "auto_stash", event = "input_closed", "stdin closed; shutting down")
        }
        _ = tokio::signal::ctrl_c() => {
            info!(
                service = "auto_stash",
                event = "shutdown_signal",
                "received Ctrl+C, shutting down"
            )
        }
    }

    runtime.shutdown().await;
    debug!(metrics = %observability::encode_metrics(), "final metrics");
    Ok(())
}
