use crate::error::ConfigError;

use super::types::QueueConfig;

impl QueueConfig {
    /// Validate the config: reject zero durations and an empty name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("queue name must not be empty".into()));
        }
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "default_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.flush_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "flush_poll_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
