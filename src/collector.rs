//! Collector Layer
//!
//! Pluggable status sources. Each collector lists the independent units it
//! fetches per cycle; the [`orchestrator`](crate::orchestrator) runs them in
//! a bounded worker pool and namespaces the results.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing status sources
//! - [`CollectUnit`]: One job or view request
//! - [`CollectorRegistry`]: Maps configuration names to factories
//!
//! # Example
//!
//! ```rust,no_run
//! use cimon::collector::jenkins::{JenkinsCollector, JenkinsConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = JenkinsConfig::new("https://ci.example.com")
//!     .with_jobs(["build", "deploy"])
//!     .with_views(["team"]);
//! let collector = JenkinsCollector::new(config)?;
//! # Ok(())
//! # }
//! ```

pub mod jenkins;
mod registry;
pub mod rotating;
mod traits;

pub use registry::{CollectorFactory, CollectorRegistry};
pub use traits::{CollectUnit, Collector, CollectorError, DEFAULT_MAX_PARALLEL_REQUESTS};
