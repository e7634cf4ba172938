//! Collector factory registry.
//!
//! Maps the `implementation` name used in configuration to a constructor.
//! The built-in table is explicit; nothing is looked up by reflection.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collector::jenkins::{JenkinsCollector, JenkinsConfig};
use crate::collector::rotating::{RotatingCollector, RotatingConfig};
use crate::collector::{Collector, CollectorError};

/// Builds a collector from its configuration settings.
pub type CollectorFactory = fn(serde_json::Value) -> Result<Arc<dyn Collector>, CollectorError>;

/// Built-in collector implementations.
const BUILTIN: &[(&str, CollectorFactory)] = &[
    ("jenkins", create_jenkins),
    ("rotating", create_rotating),
];

/// Registry of collector factories keyed by implementation name.
#[derive(Clone, Default)]
pub struct CollectorRegistry {
    factories: BTreeMap<&'static str, CollectorFactory>,
}

impl CollectorRegistry {
    /// An empty registry.
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

    /// Register (or replace) a factory.
    pub fn register(&mut self, implementation: &'static str, factory: CollectorFactory) {
        self.factories.insert(implementation, factory);
    }

    pub fn contains(&self, implementation: &str) -> bool {
        self.factories.contains_key(implementation)
    }

    /// Registered implementation names, sorted.
    pub fn implementations(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Construct a collector.
    ///
    /// # Errors
    /// Returns `CollectorError::UnknownImplementation` for unregistered names,
    /// or whatever the factory reports for invalid settings.
    pub fn create(
        &self,
        implementation: &str,
        settings: serde_json::Value,
    ) -> Result<Arc<dyn Collector>, CollectorError> {
        let factory = self
            .factories
            .get(implementation)
            .ok_or_else(|| CollectorError::UnknownImplementation(implementation.to_string()))?;
        let collector = factory(settings)?;
        tracing::debug!(implementation, collector = %collector.name(), "Collector created");
        Ok(collector)
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("implementations", &self.implementations())
            .finish()
    }
}

fn parse_settings<T: serde::de::DeserializeOwned>(
    implementation: &str,
    settings: serde_json::Value,
) -> Result<T, CollectorError> {
    serde_json::from_value(settings)
        .map_err(|e| CollectorError::Config(format!("{} settings: {}", implementation, e)))
}

fn create_jenkins(settings: serde_json::Value) -> Result<Arc<dyn Collector>, CollectorError> {
    let config: JenkinsConfig = parse_settings("jenkins", settings)?;
    Ok(Arc::new(JenkinsCollector::new(config)?))
}

fn create_rotating(settings: serde_json::Value) -> Result<Arc<dyn Collector>, CollectorError> {
    let config: RotatingConfig = parse_settings("rotating", settings)?;
    Ok(Arc::new(RotatingCollector::new(config)?))
}
