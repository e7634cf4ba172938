//! View classification and recursive traversal.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use crate::status::{Health, JobStatus, LocalStatus};

use super::client::{BuildDocument, CiClient, FetchError, ViewDocument, ViewJob};

/// Color token of disabled jobs.
const DISABLED_COLOR: &str = "disabled";

/// Suffix marking a job that is currently building.
const BUILDING_SUFFIX: &str = "anime";

fn color_health(color: &str) -> Option<Health> {
    match color {
        "red" => Some(Health::Sick),
        "yellow" => Some(Health::Unwell),
        "blue" => Some(Health::Healthy),
        "notbuilt" => Some(Health::Undefined),
        _ => None,
    }
}

/// Classify a view job's color token.
///
/// `disabled` maps to `NotFound`; unknown or null colors map to
/// [`Health::Other`]. A `_anime` suffix marks the job as building.
pub fn classify_color(color: Option<&str>) -> JobStatus {
    let Some(color) = color else {
        return JobStatus::ok(Health::Other);
    };
    let (base, suffix) = match color.split_once('_') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (color, None),
    };

    if base == DISABLED_COLOR {
        return JobStatus::not_found();
    }
    match color_health(base) {
        Some(health) => JobStatus::ok(health).with_active(suffix == Some(BUILDING_SUFFIX)),
        None => JobStatus::ok(Health::Other),
    }
}

/// The build with the highest number; the first one seen wins ties.
pub fn latest_build(builds: &[BuildDocument]) -> Option<&BuildDocument> {
    builds.iter().fold(None, |latest, build| match latest {
        Some(current) if build.number <= current.number => Some(current),
        _ => Some(build),
    })
}

/// Name of a nested view, taken from its URL.
///
/// `https://ci/view/team/view/backend/` yields `team/view/backend`, the path
/// the view API expects after `/view/`.
pub fn nested_view_name(url: &str) -> Option<String> {
    let (_, path) = url.split_once("/view/")?;
    let name = path.trim_end_matches('/');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn job_status(job: &ViewJob) -> Option<JobStatus> {
    // Entries without a color key (folders, multibranch parents) carry no status.
    let color = job.color.as_ref()?;
    let status = classify_color(color.as_deref());
    let enriched = match job.builds.as_deref().and_then(latest_build) {
        Some(build) if status.trusted_health().is_some() => build.enrich(status),
        _ => status,
    };
    Some(enriched)
}

/// Statuses of the jobs listed directly in `view`.
pub(crate) fn direct_jobs(view: &ViewDocument) -> LocalStatus {
    view.jobs
        .iter()
        .filter_map(|job| job_status(job).map(|status| (job.name.clone(), status)))
        .collect()
}

/// Depth-first walk over a view and its nested views.
///
/// The visited set is shared by the whole walk, not just one path: a view
/// reachable from two siblings is fetched once, and cycles terminate.
pub(crate) struct ViewTraversal<'a, C: CiClient + ?Sized> {
    client: &'a C,
    visited: HashSet<String>,
}

type VisitFuture<'s> = Pin<Box<dyn Future<Output = LocalStatus> + Send + 's>>;

impl<'a, C: CiClient + ?Sized> ViewTraversal<'a, C> {
    pub(crate) fn new(client: &'a C) -> Self {
        Self {
            client,
            visited: HashSet::new(),
        }
    }

    /// Walk `view_name`, returning every job reachable from it.
    pub(crate) async fn run(mut self, view_name: &str) -> LocalStatus {
        self.visit(view_name.to_string()).await
    }

    fn visit(&mut self, view_name: String) -> VisitFuture<'_> {
        Box::pin(async move {
            if !self.visited.insert(view_name.clone()) {
                return LocalStatus::new();
            }

            let view = match self.client.fetch_view(&view_name).await {
                Ok(view) => view,
                Err(e) => {
                    log_view_error(&view_name, &e);
                    return LocalStatus::from([(view_name, JobStatus::error())]);
                }
            };

            let mut statuses = direct_jobs(&view);
            tracing::debug!(
                view = %view_name,
                jobs = statuses.len(),
                nested = view.views.len(),
                "Fetched view"
            );

            for nested in view.views.iter().filter_map(|v| nested_view_name(&v.url)) {
                let nested_statuses = self.visit(nested).await;
                statuses.extend(nested_statuses);
            }
            statuses
        })
    }
}

fn log_view_error(view_name: &str, error: &FetchError) {
    match error {
        FetchError::NotFound => {
            tracing::warn!(view = %view_name, "View not found");
        }
        FetchError::Transport(reason) => {
            tracing::error!(view = %view_name, error = %reason, "Failed to fetch view");
        }
    }
}
