//! Jenkins JSON API documents and client.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::collector::CollectorError;
use crate::config::expand_env_vars;
use crate::status::JobStatus;

use super::collector::JenkinsConfig;

/// Default `depth` parameter for view requests.
///
/// Depth 0 lists jobs with their colors; depth 2 also embeds recent builds.
pub const DEFAULT_VIEW_DEPTH: u32 = 0;

/// Failure kinds a fetch can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The job, its last build, or the view does not exist.
    #[error("not found")]
    NotFound,

    /// Any transport or protocol failure other than "not found".
    #[error("transport error: {0}")]
    Transport(String),
}

// =============================================================================
// Documents
// =============================================================================

/// A build as returned by `/job/<name>/lastBuild/api/json`, or embedded in a
/// view job at depth >= 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDocument {
    #[serde(default)]
    pub number: Option<u64>,
    /// `SUCCESS`, `UNSTABLE`, `FAILURE`, ... or null while building.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub culprits: Vec<Culprit>,
}

/// Someone whose change went into a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culprit {
    #[serde(rename = "fullName")]
    pub full_name: String,
}

impl BuildDocument {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    pub fn contributors(&self) -> Vec<String> {
        self.culprits.iter().map(|c| c.full_name.clone()).collect()
    }

    /// Copy number, start time and contributors onto `status`.
    pub fn enrich(&self, mut status: JobStatus) -> JobStatus {
        if let Some(number) = self.number {
            status = status.with_build_number(number);
        }
        if let Some(started_at) = self.started_at() {
            status = status.with_timestamp(started_at);
        }
        if !self.culprits.is_empty() {
            status = status.with_contributors(self.contributors());
        }
        status
    }
}

/// A view as returned by `/view/<name>/api/json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDocument {
    #[serde(default)]
    pub jobs: Vec<ViewJob>,
    #[serde(default)]
    pub views: Vec<ViewRef>,
}

/// A job entry inside a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewJob {
    pub name: String,
    /// `None` if the key is absent (folders), `Some(None)` if it is null.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builds: Option<Vec<BuildDocument>>,
}

/// Reference to a nested view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRef {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

/// Distinguish a present-but-null field from an absent one.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Client
// =============================================================================

/// Fetch operations a CI collector needs.
#[async_trait::async_trait]
pub trait CiClient: Send + Sync + 'static {
    /// Latest build of a job.
    async fn fetch_job(&self, name: &str) -> Result<BuildDocument, FetchError>;

    /// A view with its jobs and nested view references.
    async fn fetch_view(&self, name: &str) -> Result<ViewDocument, FetchError>;
}

/// [`CiClient`] speaking the Jenkins JSON API over HTTP(S).
pub struct JenkinsHttpClient {
    base_url: String,
    client: Client,
    user: Option<String>,
    password: Option<String>,
    view_depth: u32,
}

impl JenkinsHttpClient {
    /// Build a client from collector configuration.
    ///
    /// The password supports `${VAR}` / `${VAR:-default}` expansion.
    ///
    /// # Errors
    /// Returns `CollectorError::Client` if the HTTP client cannot be built.
    pub fn from_config(config: &JenkinsConfig) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| CollectorError::Client(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
            user: config.user.clone(),
            password: config.password.as_deref().map(expand_env_vars),
            view_depth: config.view_depth,
        })
    }

    fn job_url(&self, name: &str) -> String {
        format!("{}/job/{}/lastBuild/api/json?depth=0", self.base_url, name)
    }

    fn view_url(&self, name: &str) -> String {
        format!(
            "{}/view/{}/api/json?depth={}",
            self.base_url, name, self.view_depth
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let mut request = self.client.get(url);
        if let Some(ref user) = self.user {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request to {} failed: {}", url, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound),
            status if !status.is_success() => Err(FetchError::Transport(format!(
                "HTTP {} from {}",
                status, url
            ))),
            _ => response
                .json::<T>()
                .await
                .map_err(|e| FetchError::Transport(format!("invalid JSON from {}: {}", url, e))),
        }
    }
}

impl std::fmt::Debug for JenkinsHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsHttpClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("view_depth", &self.view_depth)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl CiClient for JenkinsHttpClient {
    async fn fetch_job(&self, name: &str) -> Result<BuildDocument, FetchError> {
        self.get_json(&self.job_url(name)).await
    }

    async fn fetch_view(&self, name: &str) -> Result<ViewDocument, FetchError> {
        self.get_json(&self.view_url(name)).await
    }
}
