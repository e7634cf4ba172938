//! Configuration validation utilities.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use crate::collector::CollectorError;
use crate::output::OutputError;
use crate::window::WindowError;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),

    /// An operating hours/days spec did not parse.
    #[error("invalid operating window: {0}")]
    Window(#[from] WindowError),

    /// A collector entry could not be built.
    #[error("collector #{index} ({implementation}): {source}")]
    Collector {
        index: usize,
        implementation: String,
        #[source]
        source: CollectorError,
    },

    /// An output entry could not be built.
    #[error("output #{index} ({implementation}): {source}")]
    Output {
        index: usize,
        implementation: String,
        #[source]
        source: OutputError,
    },
}

/// Parse duration string using humantime.
///
/// Supports `30s`, `1m`, `5m30s`, `1h`, `100ms` and the other humantime forms.
///
/// # Examples
///
/// ```
/// use cimon::config::parse_duration;
///
/// assert_eq!(parse_duration("10s").unwrap().as_secs(), 10);
/// assert_eq!(parse_duration("1m30s").unwrap().as_secs(), 90);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `${VAR:-default}`. Unset variables without a
/// default expand to an empty string.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    if !input.contains("${") {
        return input.to_string();
    }

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var pattern is a valid regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| {
                caps.get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            })
        })
        .into_owned()
}

/// Fail on the first name that appears twice.
pub fn check_unique_names<'a>(
    kind: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate {} name: '{}'",
                kind, name
            )));
        }
    }
    Ok(())
}
