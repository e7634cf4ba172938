//! Core collector traits and types.

use std::fmt;

use thiserror::Error;

use crate::status::LocalStatus;

/// Default bound on in-flight requests per collector.
pub const DEFAULT_MAX_PARALLEL_REQUESTS: usize = 7;

/// Errors that can occur during collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The collector was handed a unit it does not know how to collect.
    #[error("unsupported unit: {0}")]
    UnsupportedUnit(CollectUnit),

    /// Client construction or use failed outside a single fetch.
    #[error("client error: {0}")]
    Client(String),

    /// No factory is registered under this implementation name.
    #[error("unknown collector implementation: {0}")]
    UnknownImplementation(String),
}

/// One independent request a collector performs per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectUnit {
    /// Fetch a single job directly.
    Job(String),
    /// Walk a view and everything nested in it.
    View(String),
}

impl CollectUnit {
    pub fn name(&self) -> &str {
        match self {
            Self::Job(name) | Self::View(name) => name,
        }
    }
}

impl fmt::Display for CollectUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job(name) => write!(f, "job '{}'", name),
            Self::View(name) => write!(f, "view '{}'", name),
        }
    }
}

/// Core collector trait for status sources.
///
/// The orchestrator calls [`Collector::units`] once per cycle and runs each
/// unit through [`Collector::collect_unit`] in a worker pool bounded by
/// [`Collector::max_parallel_requests`]. Results are keyed by job name only;
/// the orchestrator prefixes [`Collector::name`].
///
/// # Error Handling Philosophy
///
/// - **Fetch failures** (job missing, CI server unreachable): valid
///   observations. Record them as `NotFound`/`Error` entries and return `Ok`.
/// - **Collector errors**: the collector itself cannot work. Return `Err`;
///   the unit then contributes nothing to the cycle and the error is logged.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Source name used to namespace this collector's jobs.
    fn name(&self) -> &str;

    /// Upper bound on concurrently running units.
    fn max_parallel_requests(&self) -> usize {
        DEFAULT_MAX_PARALLEL_REQUESTS
    }

    /// Units to collect this cycle.
    fn units(&self) -> Vec<CollectUnit>;

    /// Collect one unit.
    async fn collect_unit(&self, unit: &CollectUnit) -> Result<LocalStatus, CollectorError>;
}
