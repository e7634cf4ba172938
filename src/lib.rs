//! cimon - CI Monitor
//!
//! Polls continuous-integration servers for job health during configured
//! operating hours, merges the results of every collector into one
//! namespaced snapshot, and hands that snapshot to outputs.
//!
//! # Architecture
//!
//! - **Window**: Operating hours/days and the wait until the next open slot
//! - **Collectors**: Status sources (Jenkins, a rotating demo source)
//! - **Orchestrator**: Bounded fan-out per collector, merge, dispatch
//! - **Scheduler**: Drift-free run loop with graceful stop
//! - **Outputs**: Snapshot consumers (log, JSON file)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cimon::{AppConfig, CollectorRegistry, OutputRegistry, RunLoop};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load("config.yaml")?;
//! let orchestrator =
//!     config.build_orchestrator(&CollectorRegistry::builtin(), &OutputRegistry::builtin())?;
//! let run_loop = RunLoop::new(
//!     Arc::new(orchestrator),
//!     config.operating_window()?,
//!     config.polling_interval,
//! );
//! let stop = run_loop.stop_handle();
//! let task = tokio::spawn(run_loop.run());
//! stop.stop();
//! task.await?;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod orchestrator;
pub mod output;
pub mod scheduler;
pub mod status;
pub mod window;

pub use collector::{CollectUnit, Collector, CollectorError, CollectorRegistry};
pub use config::{AppConfig, ConfigError};
pub use orchestrator::CollectionOrchestrator;
pub use output::{Output, OutputError, OutputRegistry};
pub use scheduler::{Clock, LocalClock, RunLoop, RunState, StopHandle};
pub use status::{
    Health, JobStatus, LocalStatus, RequestOutcome, SharedSnapshot, Snapshot, StatusKey,
};
pub use window::{OperatingWindow, WindowError};
