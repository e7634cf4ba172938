//! In-memory [`CiClient`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::client::{BuildDocument, CiClient, FetchError, ViewDocument};

/// Serves canned documents; unknown views fail with a transport error and
/// unknown jobs with `NotFound`.
#[derive(Debug, Default)]
pub(crate) struct MockCiClient {
    jobs: Mutex<HashMap<String, Result<BuildDocument, FetchError>>>,
    views: HashMap<String, ViewDocument>,
    view_fetches: Mutex<HashMap<String, usize>>,
}

impl MockCiClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_view(mut self, name: &str, view: ViewDocument) -> Self {
        self.views.insert(name.to_string(), view);
        self
    }

    pub(crate) fn with_job(self, name: &str, result: Result<BuildDocument, FetchError>) -> Self {
        self.set_job(name, result);
        self
    }

    /// Replace a job's response between polls.
    pub(crate) fn set_job(&self, name: &str, result: Result<BuildDocument, FetchError>) {
        self.jobs.lock().unwrap().insert(name.to_string(), result);
    }

    pub(crate) fn view_fetches(&self, name: &str) -> usize {
        self.view_fetches
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl CiClient for MockCiClient {
    async fn fetch_job(&self, name: &str) -> Result<BuildDocument, FetchError> {
        self.jobs
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(Err(FetchError::NotFound))
    }

    async fn fetch_view(&self, name: &str) -> Result<ViewDocument, FetchError> {
        *self
            .view_fetches
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default() += 1;
        self.views
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::Transport(format!("connection refused for view {}", name)))
    }
}
