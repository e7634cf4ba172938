//! Jenkins build-status collector.
//!
//! Requests the last build of each configured job and the job colors of each
//! configured view (recursively through nested views).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::{CollectUnit, Collector, CollectorError, DEFAULT_MAX_PARALLEL_REQUESTS};
use crate::status::{Health, JobStatus, LocalStatus};

use super::client::{BuildDocument, CiClient, DEFAULT_VIEW_DEPTH, FetchError, JenkinsHttpClient};
use super::health::HealthCache;
use super::view::ViewTraversal;

/// Default request timeout (10 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_max_parallel_requests() -> usize {
    DEFAULT_MAX_PARALLEL_REQUESTS
}

fn default_view_depth() -> u32 {
    DEFAULT_VIEW_DEPTH
}

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Map a Jenkins build result to health. Unknown results map to `Other`.
fn result_health(result: &str) -> Health {
    match result {
        "SUCCESS" => Health::Healthy,
        "UNSTABLE" => Health::Unwell,
        "FAILURE" => Health::Sick,
        _ => Health::Other,
    }
}

/// Configuration for a Jenkins collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JenkinsConfig {
    /// Base URL of the Jenkins instance.
    pub url: String,
    /// Source name; defaults to the host (and port) of `url`.
    #[serde(default)]
    pub name: Option<String>,
    /// User for basic authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Password or API token, `${VAR}` expanded.
    #[serde(default)]
    pub password: Option<String>,
    /// Jobs fetched directly.
    #[serde(default)]
    pub jobs: Vec<String>,
    /// Views walked recursively.
    #[serde(default)]
    pub views: Vec<String>,
    /// Maximum concurrent requests (default: 7).
    #[serde(default = "default_max_parallel_requests")]
    pub max_parallel_requests: usize,
    /// `depth` for view requests; 2 embeds build details (default: 0).
    #[serde(default = "default_view_depth")]
    pub view_depth: u32,
    /// Verify TLS certificates (default: true).
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Per-request timeout (default: 10s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl JenkinsConfig {
    /// Create a configuration for `url` with defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            user: None,
            password: None,
            jobs: Vec::new(),
            views: Vec::new(),
            max_parallel_requests: DEFAULT_MAX_PARALLEL_REQUESTS,
            view_depth: DEFAULT_VIEW_DEPTH,
            verify_ssl: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Source name: the explicit name, else `host[:port]` of the URL.
    ///
    /// # Errors
    /// Returns `CollectorError::Config` if the URL is invalid or has no host.
    pub fn source_name(&self) -> Result<String, CollectorError> {
        if let Some(ref name) = self.name {
            return Ok(name.clone());
        }
        let url = url::Url::parse(&self.url)
            .map_err(|e| CollectorError::Config(format!("invalid url '{}': {}", self.url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CollectorError::Config(format!("url '{}' has no host", self.url)))?;
        Ok(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), CollectorError> {
        self.source_name()?;
        if self.max_parallel_requests == 0 {
            return Err(CollectorError::Config(
                "max_parallel_requests must be positive".to_string(),
            ));
        }
        if self.jobs.is_empty() && self.views.is_empty() {
            return Err(CollectorError::Config(
                "at least one job or view must be configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the source name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Set the jobs fetched directly.
    pub fn with_jobs<I, S>(mut self, jobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jobs = jobs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the views walked recursively.
    pub fn with_views<I, S>(mut self, views: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.views = views.into_iter().map(Into::into).collect();
        self
    }

    /// Set the maximum number of concurrent requests.
    pub fn with_max_parallel_requests(mut self, max: usize) -> Self {
        self.max_parallel_requests = max;
        self
    }

    /// Set the view request depth.
    pub fn with_view_depth(mut self, depth: u32) -> Self {
        self.view_depth = depth;
        self
    }

    /// Set TLS certificate verification.
    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Jenkins build-status collector.
pub struct JenkinsCollector {
    name: String,
    config: JenkinsConfig,
    client: Arc<dyn CiClient>,
    health_cache: Arc<HealthCache>,
}

impl JenkinsCollector {
    /// Create a collector talking to Jenkins over HTTP.
    ///
    /// # Errors
    /// Returns `CollectorError` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: JenkinsConfig) -> Result<Self, CollectorError> {
        let client = JenkinsHttpClient::from_config(&config)?;
        Self::with_client(config, Arc::new(client), Arc::new(HealthCache::new()))
    }

    /// Create a collector with an explicit client and health cache.
    pub fn with_client(
        config: JenkinsConfig,
        client: Arc<dyn CiClient>,
        health_cache: Arc<HealthCache>,
    ) -> Result<Self, CollectorError> {
        config.validate()?;
        Ok(Self {
            name: config.source_name()?,
            config,
            client,
            health_cache,
        })
    }

    pub fn config(&self) -> &JenkinsConfig {
        &self.config
    }

    pub fn health_cache(&self) -> &Arc<HealthCache> {
        &self.health_cache
    }

    /// Status of one job from its last build.
    pub async fn collect_job(&self, job: &str) -> LocalStatus {
        let status = match self.client.fetch_job(job).await {
            Ok(build) => self.convert_build(job, &build),
            Err(FetchError::NotFound) => {
                tracing::debug!(collector = %self.name, job = %job, "No build found for job");
                JobStatus::not_found()
            }
            Err(FetchError::Transport(reason)) => {
                tracing::error!(
                    collector = %self.name,
                    job = %job,
                    error = %reason,
                    "Failed to fetch job status"
                );
                JobStatus::error()
            }
        };
        LocalStatus::from([(job.to_string(), status)])
    }

    /// Status of every job reachable from a view.
    pub async fn collect_view(&self, view: &str) -> LocalStatus {
        ViewTraversal::new(self.client.as_ref()).run(view).await
    }

    fn convert_build(&self, job: &str, build: &BuildDocument) -> JobStatus {
        let reported = build.result.as_deref().map(result_health);
        let health = self.health_cache.resolve(job, reported);
        let status = build.enrich(JobStatus::ok(health).with_active(build.building));
        tracing::trace!(collector = %self.name, job = %job, ?status, "Converted build");
        status
    }
}

impl std::fmt::Debug for JenkinsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsCollector")
            .field("name", &self.name)
            .field("url", &self.config.url)
            .field("jobs", &self.config.jobs)
            .field("views", &self.config.views)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Collector for JenkinsCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_parallel_requests(&self) -> usize {
        self.config.max_parallel_requests
    }

    fn units(&self) -> Vec<CollectUnit> {
        let jobs = self.config.jobs.iter().cloned().map(CollectUnit::Job);
        let views = self.config.views.iter().cloned().map(CollectUnit::View);
        jobs.chain(views).collect()
    }

    async fn collect_unit(&self, unit: &CollectUnit) -> Result<LocalStatus, CollectorError> {
        Ok(match unit {
            CollectUnit::Job(job) => self.collect_job(job).await,
            CollectUnit::View(view) => self.collect_view(view).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::MockCiClient;
    use super::*;
    use crate::status::RequestOutcome;
    use serde_json::json;

    fn collector(client: Arc<MockCiClient>, config: JenkinsConfig) -> JenkinsCollector {
        JenkinsCollector::with_client(config, client, Arc::new(HealthCache::new())).unwrap()
    }

    fn build(result: Option<&str>, building: bool) -> BuildDocument {
        BuildDocument {
            number: Some(42),
            result: result.map(str::to_string),
            building,
            timestamp: Some(1_467_131_487_090),
            ..BuildDocument::default()
        }
    }

    #[test]
    fn test_jenkins_config_defaults() {
        let config = JenkinsConfig::new("https://ci.example.com");

        assert_eq!(config.max_parallel_requests, DEFAULT_MAX_PARALLEL_REQUESTS);
        assert_eq!(config.view_depth, DEFAULT_VIEW_DEPTH);
        assert!(config.verify_ssl);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_jenkins_config_from_yaml() {
        let yaml = r#"
url: https://ci.example.com:8443/
user: robot
password: "${CI_TOKEN:-secret}"
jobs: [build, deploy]
views: [team]
max_parallel_requests: 3
view_depth: 2
timeout: 5s
"#;
        let config: JenkinsConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.jobs, vec!["build", "deploy"]);
        assert_eq!(config.views, vec!["team"]);
        assert_eq!(config.max_parallel_requests, 3);
        assert_eq!(config.view_depth, 2);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.source_name().unwrap(), "ci.example.com:8443");
    }

    #[test]
    fn test_source_name() {
        assert_eq!(
            JenkinsConfig::new("https://ci.example.com/jenkins")
                .source_name()
                .unwrap(),
            "ci.example.com"
        );
        assert_eq!(
            JenkinsConfig::new("https://ci.example.com")
                .with_name("main-ci")
                .source_name()
                .unwrap(),
            "main-ci"
        );
        assert!(JenkinsConfig::new("not a url").source_name().is_err());
    }

    #[test]
    fn test_validate() {
        let base = JenkinsConfig::new("https://ci.example.com");
        assert!(base.validate().is_err(), "no jobs or views");
        assert!(base.clone().with_jobs(["a"]).validate().is_ok());
        assert!(
            base.with_views(["v"])
                .with_max_parallel_requests(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_units_jobs_then_views() {
        let config = JenkinsConfig::new("https://ci")
            .with_jobs(["a", "b"])
            .with_views(["v"]);
        let collector = collector(Arc::new(MockCiClient::new()), config);

        assert_eq!(
            collector.units(),
            vec![
                CollectUnit::Job("a".into()),
                CollectUnit::Job("b".into()),
                CollectUnit::View("v".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_job_ok() {
        let mut doc = build(Some("UNSTABLE"), true);
        doc.culprits = serde_json::from_value(json!([{"fullName": "Linus"}])).unwrap();
        let client = Arc::new(MockCiClient::new().with_job("build", Ok(doc)));
        let collector = collector(client, JenkinsConfig::new("https://ci").with_jobs(["build"]));

        let statuses = collector.collect_job("build").await;
        let status = &statuses["build"];

        assert_eq!(status.outcome, RequestOutcome::Ok);
        assert_eq!(status.health, Some(Health::Unwell));
        assert!(status.active);
        assert_eq!(status.build_number, Some(42));
        assert_eq!(status.timestamp.unwrap().timestamp_millis(), 1_467_131_487_090);
        assert_eq!(status.contributors, vec!["Linus"]);
    }

    #[tokio::test]
    async fn test_collect_job_result_mapping() {
        let cases = [
            ("SUCCESS", Health::Healthy),
            ("UNSTABLE", Health::Unwell),
            ("FAILURE", Health::Sick),
            ("ABORTED", Health::Other),
        ];
        for (result, health) in cases {
            let client =
                Arc::new(MockCiClient::new().with_job("j", Ok(build(Some(result), false))));
            let collector = collector(client, JenkinsConfig::new("https://ci").with_jobs(["j"]));
            let statuses = collector.collect_job("j").await;
            assert_eq!(statuses["j"].health, Some(health), "{result}");
        }
    }

    #[tokio::test]
    async fn test_collect_job_not_found_and_error() {
        let client = Arc::new(
            MockCiClient::new()
                .with_job("gone", Err(FetchError::NotFound))
                .with_job("broken", Err(FetchError::Transport("HTTP 500".into()))),
        );
        let collector = collector(
            client,
            JenkinsConfig::new("https://ci").with_jobs(["gone", "broken"]),
        );

        assert_eq!(collector.collect_job("gone").await["gone"], JobStatus::not_found());
        assert_eq!(collector.collect_job("broken").await["broken"], JobStatus::error());
    }

    #[tokio::test]
    async fn test_health_carried_over_while_building() {
        let client =
            Arc::new(MockCiClient::new().with_job("build", Ok(build(Some("FAILURE"), false))));
        let collector = collector(
            Arc::clone(&client),
            JenkinsConfig::new("https://ci").with_jobs(["build"]),
        );

        assert_eq!(collector.collect_job("build").await["build"].health, Some(Health::Sick));

        client.set_job("build", Ok(build(None, true)));
        let statuses = collector.collect_job("build").await;
        let status = &statuses["build"];
        assert_eq!(status.health, Some(Health::Sick));
        assert!(status.active);
        assert_eq!(collector.health_cache().get("build"), Some(Health::Sick));
    }

    #[tokio::test]
    async fn test_health_unknown_without_history() {
        let client = Arc::new(MockCiClient::new().with_job("new", Ok(build(None, true))));
        let collector = collector(client, JenkinsConfig::new("https://ci").with_jobs(["new"]));

        assert_eq!(collector.collect_job("new").await["new"].health, Some(Health::Other));
    }

    #[tokio::test]
    async fn test_collect_unit_view() {
        let view = serde_json::from_value(json!({
            "jobs": [{"name": "a", "color": "blue"}, {"name": "b", "color": "red_anime"}]
        }))
        .unwrap();
        let client = Arc::new(MockCiClient::new().with_view("team", view));
        let collector = collector(client, JenkinsConfig::new("https://ci").with_views(["team"]));

        let statuses = collector
            .collect_unit(&CollectUnit::View("team".into()))
            .await
            .unwrap();
        assert_eq!(statuses.len(), 2);
        assert!(statuses["b"].active);
    }
}
