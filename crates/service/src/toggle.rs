//! Popup controller: the enabled toggle and the list of saved entries.
//!
//! Storage failures never reach the view. Reads fall back to defaults and
//! failed deletes leave the entry in place.

use models::keys::{DEFAULT_HIDDEN_KEYS, ENABLED_KEY};
use models::Capture;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::StorageError;
use crate::merge::MergePolicy;

pub const STATUS_ENABLED: &str = "Auto-save Enabled";
pub const STATUS_DISABLED: &str = "Auto-save Disabled";
pub const NO_DATA_PLACEHOLDER: &str = "No saved form data.";
pub const DELETE_ACTION: &str = "Clear";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub enabled: bool,
    pub status: &'static str,
}

impl ToggleState {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, status: if enabled { STATUS_ENABLED } else { STATUS_DISABLED } }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub key: String,
    pub label: String,
    pub action: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryList {
    Placeholder(&'static str),
    Entries(Vec<EntryView>),
}

impl EntryList {
    /// Listed keys, in display order.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Placeholder(_) => Vec::new(),
            Self::Entries(entries) => entries.iter().map(|e| e.key.as_str()).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys().contains(&key)
    }

    fn remove(&mut self, key: &str) -> bool {
        match self {
            Self::Placeholder(_) => false,
            Self::Entries(entries) => {
                let before = entries.len();
                entries.retain(|e| e.key != key);
                entries.len() != before
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupView {
    pub toggle: ToggleState,
    pub entries: EntryList,
}

/// A toggle whose write is still in flight.
pub struct PendingToggle {
    pub state: ToggleState,
    pub write: JoinHandle<Result<(), StorageError>>,
}

pub struct ToggleController {
    policy: MergePolicy,
    hidden_keys: Vec<String>,
}

impl ToggleController {
    pub fn new(policy: MergePolicy, hidden_keys: Vec<String>) -> Self {
        Self { policy, hidden_keys }
    }

    pub fn from_config(policy: MergePolicy, cfg: &configs::PopupConfig) -> Self {
        Self::new(policy, cfg.hidden_keys.clone())
    }

    /// Controller hiding only the built-in flag keys.
    pub fn with_default_hidden(policy: MergePolicy) -> Self {
        Self::new(policy, DEFAULT_HIDDEN_KEYS.iter().map(|k| k.to_string()).collect())
    }

    /// Current toggle state; an absent or unreadable flag shows as disabled.
    pub async fn load(&self) -> ToggleState {
        match self.policy.gateway().get_value(ENABLED_KEY).await {
            Ok(value) => ToggleState::new(value.and_then(|v| v.as_bool()).unwrap_or(false)),
            Err(error) => {
                warn!(%error, "cannot read enabled flag; showing disabled");
                ToggleState::new(false)
            }
        }
    }

    /// Issue the flag write and return the new state without waiting for it.
    pub fn toggle(&self, enabled: bool) -> PendingToggle {
        let policy = self.policy.clone();
        let write = tokio::spawn(async move {
            let result = policy.save(ENABLED_KEY, Capture::Flag(enabled)).await;
            match &result {
                Ok(()) => info!(enabled, "auto-save toggled"),
                Err(error) => warn!(enabled, %error, "failed to write enabled flag"),
            }
            result
        });
        PendingToggle { state: ToggleState::new(enabled), write }
    }

    /// Every stored key except the hidden flags, or the placeholder when none remain.
    pub async fn entries(&self) -> EntryList {
        let items = match self.policy.gateway().get(None).await {
            Ok(items) => items,
            Err(error) => {
                warn!(%error, "cannot list stored keys");
                return EntryList::Placeholder(NO_DATA_PLACEHOLDER);
            }
        };
        let entries: Vec<EntryView> = items
            .into_keys()
            .filter(|key| !self.is_hidden(key))
            .map(|key| EntryView { label: key.clone(), key, action: DELETE_ACTION })
            .collect();
        if entries.is_empty() {
            EntryList::Placeholder(NO_DATA_PLACEHOLDER)
        } else {
            EntryList::Entries(entries)
        }
    }

    pub async fn render(&self) -> PopupView {
        PopupView { toggle: self.load().await, entries: self.entries().await }
    }

    /// Remove one listed key from storage, then drop its entry from the view.
    /// Returns false when the key is not listed or the remove failed.
    pub async fn delete(&self, view: &mut PopupView, key: &str) -> bool {
        if !view.entries.contains(key) {
            return false;
        }
        match self.policy.clear(key).await {
            Ok(()) => view.entries.remove(key),
            Err(error) => {
                warn!(key, %error, "failed to clear stored key");
                false
            }
        }
    }

    fn is_hidden(&self, key: &str) -> bool {
        self.hidden_keys.iter().any(|k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::storage::{AreaName, LocalArea, StorageGateway};
    use models::FormField;
    use serde_json::json;
    use std::time::Duration;

    fn controller() -> ToggleController {
        let gw = StorageGateway::new(
            LocalArea::in_memory(AreaName::Local),
            RetryPolicy::disabled(),
            Duration::from_secs(1),
        );
        ToggleController::with_default_hidden(MergePolicy::new(gw))
    }

    #[tokio::test]
    async fn absent_flag_loads_disabled() {
        let c = controller();
        assert_eq!(c.load().await, ToggleState { enabled: false, status: STATUS_DISABLED });
    }

    #[tokio::test]
    async fn toggle_reports_state_before_write_completes() -> Result<(), anyhow::Error> {
        let c = controller();
        let pending = c.toggle(true);
        assert_eq!(pending.state.status, STATUS_ENABLED);
        pending.write.await??;
        assert!(c.load().await.enabled);
        Ok(())
    }

    #[tokio::test]
    async fn empty_listing_shows_placeholder() -> Result<(), anyhow::Error> {
        let c = controller();
        c.toggle(true).write.await??;
        let view = c.render().await;
        assert_eq!(view.entries, EntryList::Placeholder(NO_DATA_PLACEHOLDER));
        assert!(view.toggle.enabled);
        Ok(())
    }

    #[tokio::test]
    async fn delete_drops_only_that_entry() -> Result<(), anyhow::Error> {
        let c = controller();
        c.policy.save("https://a.test/form", FormField::new("email", "a@b.com").into()).await?;
        c.policy.save("url", Capture::Snapshot(vec![json!("https://a.test/form")])).await?;

        let mut view = c.render().await;
        assert_eq!(view.entries.keys(), vec!["https://a.test/form", "url"]);

        assert!(c.delete(&mut view, "url").await);
        assert_eq!(view.entries.keys(), vec!["https://a.test/form"]);
        assert_eq!(c.policy.gateway().get_value("url").await?, None);

        // hidden or unknown keys are never removed through the view
        c.toggle(true).write.await??;
        assert!(!c.delete(&mut view, "enabled").await);
        assert!(c.load().await.enabled);
        Ok(())
    }
}
