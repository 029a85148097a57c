//! Well-known storage keys shared by the engine and the popup.

/// Gates capture; an absent value reads as `false`.
pub const ENABLED_KEY: &str = "enabled";

/// Legacy aggregate key used before records were keyed per page.
pub const FORM_DATA_KEY: &str = "formData";

pub const FORM_SUBMITTED_KEY: &str = "form_submitted";

pub const URL_KEY: &str = "url";

/// Flag keys the popup never lists as saved data.
pub const DEFAULT_HIDDEN_KEYS: &[&str] = &[ENABLED_KEY];
