pub mod config;
pub mod error;

pub use config::{Config, LoggingConfig, QueueConfig};
pub use error::*;
