//! Output Layer
//!
//! Consumers of aggregated snapshots. The orchestrator hands every output the
//! full [`Snapshot`](crate::status::Snapshot) after each cycle; outputs that
//! care about a subset filter it themselves through [`SourceFilter`].
//!
//! # Built-in Outputs
//!
//! - [`LogOutput`]: Summary and per-job lines through `tracing`
//! - [`JsonFileOutput`]: Atomically rewritten JSON mirror of the snapshot

mod filter;
pub mod json_file;
pub mod log;
mod registry;
mod traits;

pub use filter::SourceFilter;
pub use json_file::{JsonFileConfig, JsonFileOutput};
pub use log::{LogConfig, LogOutput};
pub use registry::{OutputFactory, OutputRegistry};
pub use traits::{Output, OutputError};
