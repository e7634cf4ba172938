//! JSON file output.
//!
//! Mirrors each snapshot to a file. The document is written to a sibling
//! temp file first and renamed over the target, so readers never see a
//! partial write.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::output::{Output, OutputError, SourceFilter};
use crate::status::{Snapshot, SnapshotSummary};

fn default_name() -> String {
    "json_file".to_string()
}

fn default_pretty() -> bool {
    true
}

/// Configuration for [`JsonFileOutput`].
#[derive(Debug, Clone, Deserialize)]
pub struct JsonFileConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Target file.
    pub path: PathBuf,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    /// Delete the file when the run loop stops.
    #[serde(default)]
    pub remove_on_close: bool,
    #[serde(default)]
    pub collector_pattern: SourceFilter,
}

impl JsonFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: default_name(),
            path: path.into(),
            pretty: default_pretty(),
            remove_on_close: false,
            collector_pattern: SourceFilter::all(),
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_remove_on_close(mut self, remove: bool) -> Self {
        self.remove_on_close = remove;
        self
    }

    pub fn with_collector_pattern(mut self, filter: SourceFilter) -> Self {
        self.collector_pattern = filter;
        self
    }

    pub fn validate(&self) -> Result<(), OutputError> {
        if self.path.as_os_str().is_empty() {
            return Err(OutputError::Config("path cannot be empty".to_string()));
        }
        if self.path.file_name().is_none() {
            return Err(OutputError::Config(format!(
                "path must name a file: {}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Document written on every update.
#[derive(Debug, Serialize)]
struct StatusDocument<'a> {
    generated_at: DateTime<Utc>,
    summary: SnapshotSummary,
    jobs: &'a Snapshot,
}

/// Writes snapshots to a JSON file.
#[derive(Debug)]
pub struct JsonFileOutput {
    config: JsonFileConfig,
    temp_path: PathBuf,
}

impl JsonFileOutput {
    pub fn new(config: JsonFileConfig) -> Result<Self, OutputError> {
        config.validate()?;
        let temp_path = temp_path_for(&config.path);
        Ok(Self { config, temp_path })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn render(&self, snapshot: &Snapshot) -> Result<Vec<u8>, OutputError> {
        let document = StatusDocument {
            generated_at: Utc::now(),
            summary: snapshot.summary(),
            jobs: snapshot,
        };
        let bytes = if self.config.pretty {
            serde_json::to_vec_pretty(&document)?
        } else {
            serde_json::to_vec(&document)?
        };
        Ok(bytes)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait::async_trait]
impl Output for JsonFileOutput {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn on_update(&self, snapshot: &Snapshot) -> Result<(), OutputError> {
        let snapshot = self.config.collector_pattern.apply(snapshot);
        let bytes = self.render(&snapshot)?;

        if let Some(parent) = self.config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.temp_path, &bytes).await?;
        tokio::fs::rename(&self.temp_path, &self.config.path).await?;

        tracing::trace!(
            output = %self.config.name,
            path = %self.config.path.display(),
            bytes = bytes.len(),
            "Snapshot written"
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), OutputError> {
        if !self.config.remove_on_close {
            return Ok(());
        }
        match tokio::fs::remove_file(&self.config.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
