//! Jenkins collector against a mock Jenkins JSON API.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use cimon::collector::jenkins::{JenkinsCollector, JenkinsConfig};
use cimon::orchestrator::{CollectionOrchestrator, collect_source};
use cimon::output::{JsonFileConfig, JsonFileOutput};
use cimon::{Collector, Health, RequestOutcome};
use serde_json::json;
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

/// Serves canned Jenkins documents by path; everything else is a 404.
async fn jenkins(uri: Uri, headers: HeaderMap) -> Response {
    match uri.path() {
        "/job/build/lastBuild/api/json" => Json(json!({
            "number": 42,
            "result": "SUCCESS",
            "building": false,
            "timestamp": 1467131487090i64,
            "culprits": [{"fullName": "Ada Lovelace"}, {"fullName": "Alan Turing"}]
        }))
        .into_response(),
        "/job/running/lastBuild/api/json" => Json(json!({
            "number": 7,
            "result": null,
            "building": true,
            "timestamp": 1467131487090i64,
            "culprits": []
        }))
        .into_response(),
        "/job/broken/lastBuild/api/json" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "/job/secured/lastBuild/api/json" => {
            if headers.contains_key(header::AUTHORIZATION) {
                Json(json!({"number": 1, "result": "UNSTABLE", "building": false})).into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }
        "/view/team/api/json" => Json(json!({
            "jobs": [
                {"name": "frontend", "color": "red_anime"},
                {"name": "folder"},
                {"name": "legacy", "color": "disabled"}
            ],
            "views": [
                {"name": "backend", "url": "http://jenkins.invalid/view/team/view/backend/"},
                {"name": "team", "url": "http://jenkins.invalid/view/team/"}
            ]
        }))
        .into_response(),
        "/view/team/view/backend/api/json" => Json(json!({
            "jobs": [
                {"name": "api", "color": "blue"},
                {"name": "worker", "color": "yellow"}
            ],
            "views": [
                {"name": "team", "url": "http://jenkins.invalid/view/team/"},
                {"name": "gone", "url": "http://jenkins.invalid/view/gone/"}
            ]
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the mock server and return its base URL.
async fn start_mock_jenkins() -> String {
    let router = Router::new().fallback(jenkins);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_source_name_defaults_to_host() {
    let url = start_mock_jenkins().await;
    let collector = JenkinsCollector::new(JenkinsConfig::new(&url).with_jobs(["build"])).unwrap();
    assert_eq!(collector.name(), url.trim_start_matches("http://"));

    let named =
        JenkinsCollector::new(JenkinsConfig::new(&url).with_name("ci").with_jobs(["build"]))
            .unwrap();
    assert_eq!(named.name(), "ci");
}

#[tokio::test]
async fn test_direct_job_outcomes() {
    let url = start_mock_jenkins().await;
    let config = JenkinsConfig::new(&url)
        .with_name("ci")
        .with_jobs(["build", "running", "broken", "absent"]);
    let collector = Arc::new(JenkinsCollector::new(config).unwrap());

    let statuses = collect_source(collector).await;
    assert_eq!(statuses.len(), 4);

    let build = &statuses["build"];
    assert_eq!(build.outcome, RequestOutcome::Ok);
    assert_eq!(build.health, Some(Health::Healthy));
    assert_eq!(build.build_number, Some(42));
    assert_eq!(build.contributors, vec!["Ada Lovelace", "Alan Turing"]);
    assert_eq!(
        build.timestamp.map(|t| t.timestamp_millis()),
        Some(1467131487090)
    );
    assert!(!build.active);

    let running = &statuses["running"];
    assert_eq!(running.outcome, RequestOutcome::Ok);
    assert_eq!(running.health, Some(Health::Other));
    assert!(running.active);

    assert_eq!(statuses["broken"].outcome, RequestOutcome::Error);
    assert_eq!(statuses["absent"].outcome, RequestOutcome::NotFound);
}

#[tokio::test]
async fn test_basic_auth() {
    let url = start_mock_jenkins().await;

    let anonymous =
        JenkinsCollector::new(JenkinsConfig::new(&url).with_jobs(["secured"])).unwrap();
    let statuses = anonymous.collect_job("secured").await;
    assert_eq!(statuses["secured"].outcome, RequestOutcome::Error);

    let config = JenkinsConfig::new(&url)
        .with_credentials("monitor", "${CIMON_IT_UNSET_TOKEN:-api-token}")
        .with_jobs(["secured"]);
    let authenticated = JenkinsCollector::new(config).unwrap();
    let statuses = authenticated.collect_job("secured").await;
    assert_eq!(statuses["secured"].outcome, RequestOutcome::Ok);
    assert_eq!(statuses["secured"].health, Some(Health::Unwell));
}

#[tokio::test]
async fn test_nested_view_traversal() {
    let url = start_mock_jenkins().await;
    let collector =
        JenkinsCollector::new(JenkinsConfig::new(&url).with_views(["team"])).unwrap();

    let statuses = collector.collect_view("team").await;

    let mut names: Vec<_> = statuses.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(names, vec!["api", "frontend", "gone", "legacy", "worker"]);

    assert_eq!(statuses["frontend"].health, Some(Health::Sick));
    assert!(statuses["frontend"].active);
    assert_eq!(statuses["legacy"].outcome, RequestOutcome::NotFound);
    assert_eq!(statuses["api"].health, Some(Health::Healthy));
    assert_eq!(statuses["worker"].health, Some(Health::Unwell));
    // The missing nested view shows up as a failed entry under its own name.
    assert_eq!(statuses["gone"].outcome, RequestOutcome::Error);
}

#[tokio::test]
async fn test_missing_root_view() {
    let url = start_mock_jenkins().await;
    let collector =
        JenkinsCollector::new(JenkinsConfig::new(&url).with_views(["nowhere"])).unwrap();

    let statuses = collector.collect_view("nowhere").await;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses["nowhere"].outcome, RequestOutcome::Error);
}

#[tokio::test]
async fn test_cycle_to_json_file() {
    let url = start_mock_jenkins().await;
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("status.json");

    let collector = JenkinsCollector::new(
        JenkinsConfig::new(&url)
            .with_name("ci")
            .with_jobs(["build"])
            .with_views(["team"]),
    )
    .unwrap();
    let output = JsonFileOutput::new(JsonFileConfig::new(&path)).unwrap();
    let orchestrator =
        CollectionOrchestrator::new(vec![Arc::new(collector)], vec![Arc::new(output)]);

    let snapshot = Arc::new(orchestrator.collect().await);
    assert_eq!(snapshot.len(), 6);
    assert_eq!(orchestrator.dispatch(&snapshot).await, 1);

    let content = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["jobs"]["ci"]["build"]["health"], "healthy");
    assert_eq!(json["jobs"]["ci"]["api"]["health"], "healthy");
    assert_eq!(json["jobs"]["ci"]["gone"]["outcome"], "error");
}
