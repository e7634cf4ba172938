//! Last known health per job.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::status::Health;

/// Remembers the last health computed for each job of one collector.
///
/// Jenkins reports a null result while a build is running. Reusing the last
/// known value keeps the job from flapping to "unknown" between polls.
/// Entries never expire.
///
/// Every read-modify-write happens under one lock, so concurrent workers of
/// the same collector cannot race on a job's entry. Each collector owns its
/// own cache; caches are never shared between collectors.
#[derive(Debug, Default)]
pub struct HealthCache {
    last: Mutex<HashMap<String, Health>>,
}

impl HealthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `reported` for `job`, or fall back to the last recorded value.
    ///
    /// Returns [`Health::Other`] if nothing was reported and nothing is known.
    pub fn resolve(&self, job: &str, reported: Option<Health>) -> Health {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match reported {
            Some(health) => {
                last.insert(job.to_string(), health);
                health
            }
            None => last.get(job).copied().unwrap_or(Health::Other),
        }
    }

    pub fn get(&self, job: &str) -> Option<Health> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
