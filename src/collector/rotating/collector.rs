//! Rotating demo collector.
//!
//! Every poll moves each configured job one step through a fixed sequence
//! of health states, so outputs can be tried out without a CI server.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::collector::{CollectUnit, Collector, CollectorError};
use crate::status::{Health, JobStatus, LocalStatus};

/// Health sequence each job walks through.
const ROTATION: [Health; 4] = [Health::Healthy, Health::Unwell, Health::Sick, Health::Undefined];

/// Configuration for the rotating collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotatingConfig {
    /// Source name.
    pub name: String,
    /// Job names to report.
    pub jobs: Vec<String>,
}

impl RotatingConfig {
    pub fn new<I, S>(name: impl Into<String>, jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            jobs: jobs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.name.is_empty() {
            return Err(CollectorError::Config("name cannot be empty".to_string()));
        }
        if self.jobs.is_empty() {
            return Err(CollectorError::Config(
                "at least one job must be configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Collector reporting synthetic, rotating job states.
#[derive(Debug)]
pub struct RotatingCollector {
    config: RotatingConfig,
    cycle: AtomicUsize,
}

impl RotatingCollector {
    pub fn new(config: RotatingConfig) -> Result<Self, CollectorError> {
        config.validate()?;
        Ok(Self {
            config,
            cycle: AtomicUsize::new(0),
        })
    }

    fn status_at(&self, cycle: usize, job_index: usize) -> JobStatus {
        let step = cycle + job_index;
        JobStatus::ok(ROTATION[step % ROTATION.len()])
            .with_active(step % 2 == 1)
            .with_build_number(cycle as u64 + 1)
    }
}

#[async_trait::async_trait]
impl Collector for RotatingCollector {
    fn name(&self) -> &str {
        &self.config.name
    }

    /// Advances the rotation; called once per cycle.
    fn units(&self) -> Vec<CollectUnit> {
        self.cycle.fetch_add(1, Ordering::Relaxed);
        self.config
            .jobs
            .iter()
            .cloned()
            .map(CollectUnit::Job)
            .collect()
    }

    async fn collect_unit(&self, unit: &CollectUnit) -> Result<LocalStatus, CollectorError> {
        let CollectUnit::Job(job) = unit else {
            return Err(CollectorError::UnsupportedUnit(unit.clone()));
        };
        let index = self
            .config
            .jobs
            .iter()
            .position(|j| j == job)
            .ok_or_else(|| CollectorError::UnsupportedUnit(unit.clone()))?;
        // `units` already advanced the counter for this cycle.
        let cycle = self.cycle.load(Ordering::Relaxed).saturating_sub(1);
        Ok(LocalStatus::from([(job.clone(), self.status_at(cycle, index))]))
    }
}
