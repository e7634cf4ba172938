//! Output factory registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::output::{JsonFileConfig, JsonFileOutput, LogConfig, LogOutput, Output, OutputError};

/// Builds an output from its configuration settings.
pub type OutputFactory = fn(serde_json::Value) -> Result<Arc<dyn Output>, OutputError>;

const BUILTIN: &[(&str, OutputFactory)] = &[("json_file", create_json_file), ("log", create_log)];

/// Registry of output factories keyed by implementation name.
#[derive(Clone, Default)]
pub struct OutputRegistry {
    factories: BTreeMap<&'static str, OutputFactory>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in implementation.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for &(name, factory) in BUILTIN {
            registry.register(name, factory);
        }
        registry
    }

    pub fn register(&mut self, implementation: &'static str, factory: OutputFactory) {
        self.factories.insert(implementation, factory);
    }

    pub fn contains(&self, implementation: &str) -> bool {
        self.factories.contains_key(implementation)
    }

    pub fn implementations(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Construct an output.
    pub fn create(
        &self,
        implementation: &str,
        settings: serde_json::Value,
    ) -> Result<Arc<dyn Output>, OutputError> {
        let factory = self
            .factories
            .get(implementation)
            .ok_or_else(|| OutputError::UnknownImplementation(implementation.to_string()))?;
        let output = factory(settings)?;
        tracing::debug!(implementation, output = %output.name(), "Output created");
        Ok(output)
    }
}

impl std::fmt::Debug for OutputRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRegistry")
            .field("implementations", &self.implementations())
            .finish()
    }
}

fn parse_settings<T: serde::de::DeserializeOwned>(
    implementation: &str,
    settings: serde_json::Value,
) -> Result<T, OutputError> {
    serde_json::from_value(settings)
        .map_err(|e| OutputError::Config(format!("{} settings: {}", implementation, e)))
}

fn create_log(settings: serde_json::Value) -> Result<Arc<dyn Output>, OutputError> {
    let config: LogConfig = parse_settings("log", settings)?;
    Ok(Arc::new(LogOutput::new(config)))
}

fn create_json_file(settings: serde_json::Value) -> Result<Arc<dyn Output>, OutputError> {
    let config: JsonFileConfig = parse_settings("json_file", settings)?;
    Ok(Arc::new(JsonFileOutput::new(config)?))
}
