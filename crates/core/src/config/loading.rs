use std::path::Path;

use crate::error::ConfigError;

use super::env::parse_bool;
use super::types::QueueConfig;

impl QueueConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `SERIALQ_KEY` overrides `key`.
    /// - `SERIALQ_NAME` -> `name`
    /// - `SERIALQ_DEFAULT_TIMEOUT_MS` -> `default_timeout_ms`
    /// - `SERIALQ_ABORT_ON_TIMEOUT` -> `abort_on_timeout`
    /// - `SERIALQ_FLUSH_POLL_INTERVAL_MS` -> `flush_poll_interval_ms`
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary `SERIALQ_*` key lookup.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SERIALQ_NAME") {
            self.name = v;
        }
        if let Some(v) = lookup("SERIALQ_DEFAULT_TIMEOUT_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                self.default_timeout_ms = ms;
            }
        }
        if let Some(v) = lookup("SERIALQ_ABORT_ON_TIMEOUT") {
            if let Some(abort) = parse_bool(&v) {
                self.abort_on_timeout = abort;
            }
        }
        if let Some(v) = lookup("SERIALQ_FLUSH_POLL_INTERVAL_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                self.flush_poll_interval_ms = ms;
            }
        }
    }
}
