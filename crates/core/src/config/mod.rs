//! Runtime configuration for serialq.
//!
//! Two entry points:
//! - [`Config::from_env`] builds everything from (profiled) environment
//!   variables, after an optional `.env` file has been loaded.
//! - [`QueueConfig::from_toml`] / [`QueueConfig::from_file`] parse a TOML
//!   table and then apply `SERIALQ_*` environment overrides.

mod env;
mod loading;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use env::load_dotenv;
pub use types::{Config, LoggingConfig, QueueConfig};
