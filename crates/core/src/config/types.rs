use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::env::{env_or, profiled_env_bool, profiled_env_or, profiled_env_u64};

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SERIALQ_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_or("SERIALQ_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    /// The queue section is validated the same way a TOML file is.
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let config = Self {
            profile: p.to_string(),
            queue: QueueConfig::from_env_profiled(p),
            logging: LoggingConfig::from_env_profiled(p),
        };
        config.queue.validate()?;
        Ok(config)
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  queue:    name={}, default_timeout={}ms, abort_on_timeout={}",
            self.queue.name,
            self.queue.default_timeout_ms,
            self.queue.abort_on_timeout
        );
        tracing::info!("  logging:  filter={}", self.logging.filter);
    }

    /// Summary view for diagnostics output.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "queue": self.queue,
            "logging": { "filter": self.logging.filter },
        })
    }
}

// ── Queue ─────────────────────────────────────────────────────

/// Scheduler-wide settings for a task queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Label used in log lines; useful when several queues share a process.
    #[serde(default = "default_name")]
    pub name: String,
    /// Upper bound on how long the drain waits for an asynchronous callback
    /// when the task carries no timeout of its own.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Abort the callback's task once its timeout elapses instead of letting
    /// it run on detached.
    #[serde(default)]
    pub abort_on_timeout: bool,
    /// Upper bound between two idle checks while `flush()` waits.
    #[serde(default = "default_flush_poll_interval_ms")]
    pub flush_poll_interval_ms: u64,
}

fn default_name() -> String { "serialq".into() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_flush_poll_interval_ms() -> u64 { 10 }

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            default_timeout_ms: default_timeout_ms(),
            abort_on_timeout: false,
            flush_poll_interval_ms: default_flush_poll_interval_ms(),
        }
    }
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            name: profiled_env_or(p, "QUEUE_NAME", &default_name()),
            default_timeout_ms: profiled_env_u64(p, "QUEUE_DEFAULT_TIMEOUT_MS", default_timeout_ms()),
            abort_on_timeout: profiled_env_bool(p, "QUEUE_ABORT_ON_TIMEOUT", false),
            flush_poll_interval_ms: profiled_env_u64(
                p,
                "QUEUE_FLUSH_POLL_INTERVAL_MS",
                default_flush_poll_interval_ms(),
            ),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn flush_poll_interval(&self) -> Duration {
        Duration::from_millis(self.flush_poll_interval_ms)
    }

    /// Builder-style override of the default timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_abort_on_timeout(mut self, abort: bool) -> Self {
        self.abort_on_timeout = abort;
        self
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl LoggingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            filter: profiled_env_or(p, "LOG_FILTER", "info"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".into() }
    }
}
