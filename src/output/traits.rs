//! Core output trait and errors.

use thiserror::Error;

use crate::status::Snapshot;

/// Errors reported by outputs.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid output settings.
    #[error("config error: {0}")]
    Config(String),

    /// No factory is registered under this implementation name.
    #[error("unknown output implementation: {0}")]
    UnknownImplementation(String),

    /// The output could not deliver an update.
    #[error("output failed: {0}")]
    Failed(String),
}

/// A consumer of aggregated status snapshots.
///
/// `on_update` is called once per completed cycle with the full snapshot.
/// Errors are logged by the caller and never affect other outputs or the
/// next cycle. `close` is called exactly once when the run loop stops.
#[async_trait::async_trait]
pub trait Output: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn on_update(&self, snapshot: &Snapshot) -> Result<(), OutputError>;

    async fn close(&self) -> Result<(), OutputError> {
        Ok(())
    }
}
