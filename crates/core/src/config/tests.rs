use std::collections::HashMap;
use std::time::Duration;

use super::env::parse_bool;
use super::types::{Config, QueueConfig};
use crate::error::ConfigError;

#[test]
fn parse_minimal_toml() {
    let cfg = QueueConfig::from_toml("").unwrap();
    assert_eq!(cfg, QueueConfig::default());
}

#[test]
fn parse_full_toml() {
    let toml = r#"
name = "document-store"
default_timeout_ms = 2500
abort_on_timeout = true
flush_poll_interval_ms = 5
"#;
    let cfg = QueueConfig::from_toml(toml).unwrap();
    assert_eq!(cfg.name, "document-store");
    assert_eq!(cfg.default_timeout(), Duration::from_millis(2500));
    assert!(cfg.abort_on_timeout);
    assert_eq!(cfg.flush_poll_interval(), Duration::from_millis(5));
}

#[test]
fn reject_zero_timeout() {
    let err = QueueConfig::from_toml("default_timeout_ms = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("default_timeout_ms"));
}

#[test]
fn reject_zero_poll_interval() {
    let err = QueueConfig::from_toml("flush_poll_interval_ms = 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn reject_blank_name() {
    let err = QueueConfig::from_toml(r#"name = "  ""#).unwrap_err();
    assert!(err.to_string().contains("name"));
}

#[test]
fn reject_malformed_toml() {
    let err = QueueConfig::from_toml("default_timeout_ms = \"soon\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_is_io_error() {
    let err = QueueConfig::from_file("/nonexistent/serialq.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn overrides_replace_parsed_values() {
    let mut cfg = QueueConfig::from_toml("flush_poll_interval_ms = 7").unwrap();
    let env: HashMap<&str, &str> = [
        ("SERIALQ_FLUSH_POLL_INTERVAL_MS", "42"),
        ("SERIALQ_ABORT_ON_TIMEOUT", "yes"),
        ("SERIALQ_DEFAULT_TIMEOUT_MS", "not-a-number"),
    ]
    .into_iter()
    .collect();
    cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(cfg.flush_poll_interval_ms, 42);
    assert!(cfg.abort_on_timeout);
    // unparseable values leave the parsed setting alone
    assert_eq!(cfg.default_timeout_ms, 10_000);
}

#[test]
fn profiled_env_prefers_prefixed_key() {
    std::env::set_var("QTEST_QUEUE_NAME", "profiled");
    std::env::set_var("QTEST_QUEUE_DEFAULT_TIMEOUT_MS", "1234");
    let cfg = Config::for_profile("qtest").unwrap();
    assert_eq!(cfg.profile, "QTEST");
    assert_eq!(cfg.profile_label(), "QTEST");
    assert_eq!(cfg.queue.name, "profiled");
    assert_eq!(cfg.queue.default_timeout_ms, 1234);
    std::env::remove_var("QTEST_QUEUE_NAME");
    std::env::remove_var("QTEST_QUEUE_DEFAULT_TIMEOUT_MS");
}

#[test]
fn env_zero_timeout_is_rejected() {
    std::env::set_var("QZEROTIMEOUT_QUEUE_DEFAULT_TIMEOUT_MS", "0");
    let err = Config::for_profile("qzerotimeout").unwrap_err();
    std::env::remove_var("QZEROTIMEOUT_QUEUE_DEFAULT_TIMEOUT_MS");
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("default_timeout_ms"));
}

#[test]
fn env_zero_poll_interval_is_rejected() {
    std::env::set_var("QZEROPOLL_QUEUE_FLUSH_POLL_INTERVAL_MS", "0");
    let err = Config::for_profile("qzeropoll").unwrap_err();
    std::env::remove_var("QZEROPOLL_QUEUE_FLUSH_POLL_INTERVAL_MS");
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("flush_poll_interval_ms"));
}

#[test]
fn default_profile_label() {
    let cfg = Config::for_profile("").unwrap();
    assert_eq!(cfg.profile_label(), "default");
    let summary = cfg.summary();
    assert_eq!(summary["profile"], "default");
}

#[test]
fn builder_overrides() {
    let cfg = QueueConfig::default()
        .with_name("edits")
        .with_default_timeout(Duration::from_millis(50))
        .with_abort_on_timeout(true);
    assert_eq!(cfg.name, "edits");
    assert_eq!(cfg.default_timeout_ms, 50);
    assert!(cfg.abort_on_timeout);
    assert!(cfg.validate().is_ok());
}

#[test]
fn bool_spellings() {
    assert_eq!(parse_bool("true"), Some(true));
    assert_eq!(parse_bool(" YES "), Some(true));
    assert_eq!(parse_bool("0"), Some(false));
    assert_eq!(parse_bool("off"), Some(false));
    assert_eq!(parse_bool("maybe"), None);
}
