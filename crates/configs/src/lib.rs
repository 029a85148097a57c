use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file backing the local area; empty keeps everything in memory.
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_area")]
    pub area: String,
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            area: default_area(),
            op_timeout_ms: default_op_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopupConfig {
    /// Flag keys never listed as saved form data.
    #[serde(default = "default_hidden_keys")]
    pub hidden_keys: Vec<String>,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self { hidden_keys: default_hidden_keys() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_storage_path() -> String { "data/local_storage.json".into() }
fn default_area() -> String { "local".into() }
fn default_op_timeout() -> u64 { 2_000 }
fn default_true() -> bool { true }
fn default_max_attempts() -> u32 { 3 }
fn default_backoff_base() -> u64 { 50 }
fn default_backoff_max() -> u64 { 1_000 }
fn default_hidden_keys() -> Vec<String> { vec!["enabled".into()] }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.storage.normalize()?;
        self.retry.normalize()?;
        self.popup.normalize();
        Ok(())
    }
}

impl StorageConfig {
    fn normalize(&mut self) -> Result<()> {
        self.path = self.path.trim().to_string();
        self.area = self.area.trim().to_ascii_lowercase();
        if !matches!(self.area.as_str(), "local" | "sync" | "managed" | "session") {
            return Err(anyhow!("storage.area must be one of local, sync, managed, session"));
        }
        if self.op_timeout_ms == 0 {
            return Err(anyhow!("storage.op_timeout_ms must be a positive number of milliseconds"));
        }
        Ok(())
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn is_persistent(&self) -> bool {
        !self.path.is_empty()
    }
}

impl RetryConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.max_attempts == 0 {
            self.max_attempts = 1;
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(anyhow!("retry.backoff_max_ms must be >= backoff_base_ms"));
        }
        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

impl PopupConfig {
    fn normalize(&mut self) {
        self.hidden_keys.retain(|k| !k.trim().is_empty());
        if !self.hidden_keys.iter().any(|k| k == "enabled") {
            self.hidden_keys.push("enabled".into());
        }
    }
}
