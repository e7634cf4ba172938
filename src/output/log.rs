//! Tracing-backed output.
//!
//! Logs one summary line per snapshot at `info` and one line per job at
//! `debug`, sorted by source and job name.

use serde::Deserialize;

use crate::output::{Output, OutputError, SourceFilter};
use crate::status::Snapshot;

fn default_name() -> String {
    "log".to_string()
}

/// Configuration for [`LogOutput`].
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Only sources matching this regex are logged.
    #[serde(default)]
    pub collector_pattern: SourceFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            collector_pattern: SourceFilter::all(),
        }
    }
}

/// Writes snapshots to the log.
#[derive(Debug)]
pub struct LogOutput {
    config: LogConfig,
}

impl LogOutput {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl Output for LogOutput {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn on_update(&self, snapshot: &Snapshot) -> Result<(), OutputError> {
        let snapshot = self.config.collector_pattern.apply(snapshot);
        let summary = snapshot.summary();
        tracing::info!(
            output = %self.config.name,
            jobs = snapshot.len(),
            healthy = summary.healthy,
            unwell = summary.unwell,
            sick = summary.sick,
            other = summary.other,
            not_found = summary.not_found,
            error = summary.error,
            building = summary.building,
            "Status snapshot"
        );

        let mut entries: Vec<_> = snapshot.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (key, status) in entries {
            tracing::debug!(
                output = %self.config.name,
                job = %key,
                outcome = %status.outcome,
                health = ?status.trusted_health(),
                active = status.is_building(),
                build = ?status.build_number,
                "Job status"
            );
        }
        Ok(())
    }
}
