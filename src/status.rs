//! Status model shared by collectors, the orchestrator and outputs.
//!
//! A collector produces a [`LocalStatus`] keyed by job name only; the
//! orchestrator namespaces it with the collector's source name into a
//! [`Snapshot`] keyed by [`StatusKey`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Last known build outcome of a job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Health {
    Healthy,
    Unwell,
    Sick,
    Undefined,
    #[default]
    Other,
}

/// Outcome of fetching one unit of status.
///
/// Always check the outcome before trusting health or activity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestOutcome {
    #[default]
    Ok,
    NotFound,
    Error,
}

/// One job's last known state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobStatus {
    /// Whether the fetch succeeded.
    pub outcome: RequestOutcome,
    /// Health, present only when `outcome` is `Ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
    /// Currently building.
    #[serde(default)]
    pub active: bool,
    /// Start of the last build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Number of the last build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<u64>,
    /// People whose changes went into the last build.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<String>,
}

impl JobStatus {
    /// A successfully fetched status with the given health.
    pub fn ok(health: Health) -> Self {
        Self {
            outcome: RequestOutcome::Ok,
            health: Some(health),
            ..Self::default()
        }
    }

    /// The job (or its last build) does not exist.
    pub fn not_found() -> Self {
        Self {
            outcome: RequestOutcome::NotFound,
            ..Self::default()
        }
    }

    /// The fetch failed.
    pub fn error() -> Self {
        Self {
            outcome: RequestOutcome::Error,
            ..Self::default()
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_build_number(mut self, number: u64) -> Self {
        self.build_number = Some(number);
        self
    }

    pub fn with_contributors(mut self, contributors: Vec<String>) -> Self {
        self.contributors = contributors;
        self
    }

    /// Health if the status was fetched successfully.
    pub fn trusted_health(&self) -> Option<Health> {
        match self.outcome {
            RequestOutcome::Ok => self.health,
            _ => None,
        }
    }

    /// Activity if the status was fetched successfully.
    pub fn is_building(&self) -> bool {
        self.outcome == RequestOutcome::Ok && self.active
    }
}

/// Composite identity of a job across all sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatusKey {
    /// Name of the collector that produced the status.
    pub source: String,
    /// Job (or failed view) name within that source.
    pub job: String,
}

impl StatusKey {
    pub fn new(source: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            job: job.into(),
        }
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.job)
    }
}

/// Status produced by one collector, keyed by job name.
pub type LocalStatus = HashMap<String, JobStatus>;

/// Complete namespaced status of one poll cycle.
///
/// Published behind an [`Arc`] so outputs only ever see a finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: HashMap<StatusKey, JobStatus>,
}

/// Shared handle to a published snapshot.
pub type SharedSnapshot = Arc<Snapshot>;

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace a collector's local result under `source`.
    pub fn from_local(source: &str, local: LocalStatus) -> Self {
        let entries = local
            .into_iter()
            .map(|(job, status)| (StatusKey::new(source, job), status))
            .collect();
        Self { entries }
    }

    /// Union `other` into `self`, returning keys that were already present.
    pub fn merge(&mut self, other: Snapshot) -> Vec<StatusKey> {
        let mut collisions = Vec::new();
        for (key, status) in other.entries {
            if self.entries.insert(key.clone(), status).is_some() {
                collisions.push(key);
            }
        }
        collisions
    }

    pub fn insert(&mut self, key: StatusKey, status: JobStatus) -> Option<JobStatus> {
        self.entries.insert(key, status)
    }

    pub fn get(&self, key: &StatusKey) -> Option<&JobStatus> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StatusKey, &JobStatus)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StatusKey> {
        self.entries.keys()
    }

    /// Keep only entries whose source satisfies `keep`.
    pub fn filter_sources(&self, keep: impl Fn(&str) -> bool) -> Snapshot {
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| keep(&key.source))
            .map(|(key, status)| (key.clone(), status.clone()))
            .collect();
        Snapshot { entries }
    }

    /// Tally of entries for log summaries.
    pub fn summary(&self) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();
        for status in self.entries.values() {
            match status.outcome {
                RequestOutcome::Ok => match status.health.unwrap_or_default() {
                    Health::Healthy => summary.healthy += 1,
                    Health::Unwell => summary.unwell += 1,
                    Health::Sick => summary.sick += 1,
                    Health::Undefined | Health::Other => summary.other += 1,
                },
                RequestOutcome::NotFound => summary.not_found += 1,
                RequestOutcome::Error => summary.error += 1,
            }
            if status.is_building() {
                summary.building += 1;
            }
        }
        summary
    }
}

impl FromIterator<(StatusKey, JobStatus)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (StatusKey, JobStatus)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Snapshot {
    /// Serializes as `{source: {job: status}}` with sorted keys.
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use std::collections::BTreeMap;

        let mut nested: BTreeMap<&str, BTreeMap<&str, &JobStatus>> = BTreeMap::new();
        for (key, status) in &self.entries {
            nested
                .entry(key.source.as_str())
                .or_default()
                .insert(key.job.as_str(), status);
        }
        nested.serialize(serializer)
    }
}

/// Counts per outcome/health in a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub healthy: usize,
    pub unwell: usize,
    pub sick: usize,
    pub other: usize,
    pub not_found: usize,
    pub error: usize,
    pub building: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrusted_fields_on_failed_outcome() {
        let status = JobStatus {
            active: true,
            ..JobStatus::error()
        };
        assert_eq!(status.trusted_health(), None);
        assert!(!status.is_building());

        let ok = JobStatus::ok(Health::Sick).with_active(true);
        assert_eq!(ok.trusted_health(), Some(Health::Sick));
        assert!(ok.is_building());
    }

    #[test]
    fn test_from_local_namespaces_keys() {
        let mut local = LocalStatus::new();
        local.insert("build".to_string(), JobStatus::ok(Health::Healthy));

        let snapshot = Snapshot::from_local("ci.example.com", local);
        assert_eq!(snapshot.len(), 1);
        assert!(
            snapshot
                .get(&StatusKey::new("ci.example.com", "build"))
                .is_some()
        );
    }

    #[test]
    fn test_merge_same_job_name_from_two_sources() {
        let mut a = LocalStatus::new();
        a.insert("deploy".to_string(), JobStatus::ok(Health::Healthy));
        let mut b = LocalStatus::new();
        b.insert("deploy".to_string(), JobStatus::ok(Health::Sick));

        let mut snapshot = Snapshot::from_local("a", a);
        let collisions = snapshot.merge(Snapshot::from_local("b", b));

        assert!(collisions.is_empty());
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.get(&StatusKey::new("b", "deploy")).unwrap().health,
            Some(Health::Sick)
        );
    }

    #[test]
    fn test_merge_reports_collisions() {
        let mut snapshot: Snapshot = [(StatusKey::new("a", "x"), JobStatus::ok(Health::Healthy))]
            .into_iter()
            .collect();
        let other: Snapshot = [(StatusKey::new("a", "x"), JobStatus::error())]
            .into_iter()
            .collect();

        let collisions = snapshot.merge(other);
        assert_eq!(collisions, vec![StatusKey::new("a", "x")]);
    }

    #[test]
    fn test_summary_counts() {
        let snapshot: Snapshot = [
            (StatusKey::new("s", "a"), JobStatus::ok(Health::Healthy)),
            (
                StatusKey::new("s", "b"),
                JobStatus::ok(Health::Sick).with_active(true),
            ),
            (StatusKey::new("s", "c"), JobStatus::not_found()),
            (StatusKey::new("s", "d"), JobStatus::error()),
            (StatusKey::new("s", "e"), JobStatus::ok(Health::Undefined)),
        ]
        .into_iter()
        .collect();

        let summary = snapshot.summary();
        assert_eq!(summary.healthy, 1);
        assert_eq!(summary.sick, 1);
        assert_eq!(summary.other, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.building, 1);
    }

    #[test]
    fn test_snapshot_serializes_nested_by_source() {
        let snapshot: Snapshot = [
            (StatusKey::new("ci", "build"), JobStatus::ok(Health::Healthy)),
            (StatusKey::new("ci", "gone"), JobStatus::not_found()),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["ci"]["build"]["health"], "healthy");
        assert_eq!(json["ci"]["build"]["outcome"], "ok");
        assert_eq!(json["ci"]["gone"]["outcome"], "not_found");
        assert!(json["ci"]["gone"].get("health").is_none());
    }

    #[test]
    fn test_health_from_str() {
        assert_eq!("unwell".parse::<Health>().ok(), Some(Health::Unwell));
        assert_eq!(Health::Sick.as_ref(), "sick");
        assert!("purple".parse::<Health>().is_err());
    }
}
