//! Configuration module for cimon.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Polling cadence and operating window
//! - Collector and output definitions (`implementation` plus settings)

mod app;
mod plugin;
mod validation;

pub use app::{AppConfig, DEFAULT_POLLING_INTERVAL, MIN_POLLING_INTERVAL};
pub use plugin::PluginConfig;
pub use validation::{ConfigError, check_unique_names, expand_env_vars, parse_duration};
