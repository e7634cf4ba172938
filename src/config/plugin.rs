//! Collector and output entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One configured collector or output.
///
/// ```yaml
/// - implementation: jenkins
///   url: https://ci.example.com
///   jobs: [build]
/// ```
///
/// Everything besides `implementation` is handed to the registered factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub implementation: String,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl PluginConfig {
    pub fn new(implementation: impl Into<String>) -> Self {
        Self {
            implementation: implementation.into(),
            settings: Map::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Settings as a JSON object for factory deserialization.
    pub fn settings_value(&self) -> Value {
        Value::Object(self.settings.clone())
    }
}
