//! Application configuration model.
//!
//! Loaded from `config.toml` by the infrastructure `ConfigService`:
//!
//! ```toml
//! [runtime]
//! debounce_ms = 300
//! unknown_step_policy = "allow"
//!
//! [storage]
//! data_dir = "/var/lib/guestflow"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Quiet period after the last response edit before it is written.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub unknown_step_policy: UnknownStepPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            unknown_step_policy: UnknownStepPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// How the validator treats step types it does not recognise.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStepPolicy {
    /// Report valid so newer experiences never strand a guest.
    #[default]
    Allow,
    /// Report invalid until the runtime learns the type.
    Block,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StorageConfig {
    /// Root of the session document store; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();

        assert_eq!(config.runtime.debounce(), Duration::from_millis(300));
        assert_eq!(config.runtime.unknown_step_policy, UnknownStepPolicy::Allow);
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_parses_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            [runtime]
            debounce_ms = 50
            unknown_step_policy = "block"

            [storage]
            data_dir = "/tmp/guestflow"
            "#,
        )
        .unwrap();

        assert_eq!(config.runtime.debounce_ms, 50);
        assert_eq!(config.runtime.unknown_step_policy, UnknownStepPolicy::Block);
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/guestflow")));
    }
}
