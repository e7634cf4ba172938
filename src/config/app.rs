//! Application configuration structures.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::collector::{Collector, CollectorRegistry};
use crate::orchestrator::CollectionOrchestrator;
use crate::output::{Output, OutputRegistry};
use crate::window::{ALL_DAYS, ALL_HOURS, OperatingWindow};

use super::plugin::PluginConfig;
use super::validation::{ConfigError, check_unique_names};

// =============================================================================
// Constants
// =============================================================================

/// Default polling interval (10 seconds).
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);

/// Minimum polling interval (1 second).
pub const MIN_POLLING_INTERVAL: Duration = Duration::from_secs(1);

fn default_polling_interval() -> Duration {
    DEFAULT_POLLING_INTERVAL
}

/// Accepts `operating_days: 5` as well as `operating_days: "0-4"`.
fn deserialize_window_spec<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Spec {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Spec>::deserialize(deserializer)?.map(|spec| match spec {
        Spec::Text(text) => text,
        Spec::Number(n) => n.to_string(),
    }))
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
///
/// ```yaml
/// polling_interval: 30s
/// operating_hours: 7-19
/// operating_days: 0-4
/// collectors:
///   - implementation: jenkins
///     url: https://ci.example.com
///     jobs: [build]
/// outputs:
///   - implementation: log
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Time between cycle starts (default: 10s, minimum: 1s).
    #[serde(default = "default_polling_interval", with = "humantime_serde")]
    pub polling_interval: Duration,

    /// Hours of the day to poll in, e.g. `"7-19"` (default: all).
    #[serde(default, deserialize_with = "deserialize_window_spec")]
    pub operating_hours: Option<String>,

    /// Days of the week to poll on, 0 = Monday (default: all).
    #[serde(default, deserialize_with = "deserialize_window_spec")]
    pub operating_days: Option<String>,

    #[serde(default)]
    pub collectors: Vec<PluginConfig>,

    #[serde(default)]
    pub outputs: Vec<PluginConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override the polling interval, e.g. from the command line.
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    /// Validate configuration values.
    ///
    /// Implementation names and collector name uniqueness are checked when
    /// the entries are built against a registry.
    ///
    /// # Errors
    /// Returns `ConfigError` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_interval < MIN_POLLING_INTERVAL {
            return Err(ConfigError::ValidationError(format!(
                "polling_interval must be at least {}",
                humantime::format_duration(MIN_POLLING_INTERVAL)
            )));
        }

        self.operating_window()?;

        if self.collectors.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one collector must be configured".to_string(),
            ));
        }
        if self.outputs.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one output must be configured".to_string(),
            ));
        }

        for (kind, entries) in [("collector", &self.collectors), ("output", &self.outputs)] {
            if let Some(index) = entries.iter().position(|e| e.implementation.is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "{} #{} has an empty implementation",
                    kind, index
                )));
            }
        }

        Ok(())
    }

    /// The configured operating window.
    pub fn operating_window(&self) -> Result<OperatingWindow, ConfigError> {
        let hours = self.operating_hours.as_deref().unwrap_or(ALL_HOURS);
        let days = self.operating_days.as_deref().unwrap_or(ALL_DAYS);
        Ok(OperatingWindow::parse(hours, days)?)
    }

    /// Instantiate every collector.
    ///
    /// # Errors
    /// Fails on unknown implementations, invalid settings, or two collectors
    /// resolving to the same source name.
    pub fn build_collectors(
        &self,
        registry: &CollectorRegistry,
    ) -> Result<Vec<Arc<dyn Collector>>, ConfigError> {
        let collectors = self
            .collectors
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                registry
                    .create(&entry.implementation, entry.settings_value())
                    .map_err(|source| ConfigError::Collector {
                        index,
                        implementation: entry.implementation.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        check_unique_names("collector", collectors.iter().map(|c| c.name()))?;
        Ok(collectors)
    }

    /// Instantiate every output.
    pub fn build_outputs(
        &self,
        registry: &OutputRegistry,
    ) -> Result<Vec<Arc<dyn Output>>, ConfigError> {
        self.outputs
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                registry
                    .create(&entry.implementation, entry.settings_value())
                    .map_err(|source| ConfigError::Output {
                        index,
                        implementation: entry.implementation.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Build the orchestrator for this configuration.
    pub fn build_orchestrator(
        &self,
        collectors: &CollectorRegistry,
        outputs: &OutputRegistry,
    ) -> Result<CollectionOrchestrator, ConfigError> {
        Ok(CollectionOrchestrator::new(
            self.build_collectors(collectors)?,
            self.build_outputs(outputs)?,
        ))
    }
}
