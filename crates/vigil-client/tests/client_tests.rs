//! HTTP tests for the resource client against a mock server.
//!
//! These tests verify that the client:
//! 1. Merges runtimes and apps into one snapshot
//! 2. Maps 404 onto not-found and 5xx onto recoverable request errors
//! 3. Fetches error details and staging bucket artifacts
//! 4. Reads workspace state and migration reports

use chrono::Utc;
use vigil_client::ResourceClient;
use vigil_core::config::ApiConfig;
use vigil_core::source::{DetailSource, MigrationSource, ResourceSource, WorkspaceStateSource};
use vigil_core::types::{
    MigrationOutcome, MigrationStep, ResourceKind, ResourceRecord, ResourceStatus, WorkspaceRef,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

fn client_for(server: &MockServer) -> ResourceClient {
    let config = ApiConfig {
        base_url: server.uri(),
        storage_url: server.uri(),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    ResourceClient::with_token(&config, "test-token").unwrap()
}

fn scope() -> WorkspaceRef {
    WorkspaceRef::new("billing", "my-ws").with_workspace_id("ws-1")
}

#[tokio::test]
async fn test_fetch_merges_runtimes_and_apps() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/runtimes/ws-1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": 7,
                "runtimeName": "saturn-7",
                "status": "Running",
                "auditInfo": {"createdDate": "2024-05-01T10:00:00Z"},
                "labels": {"tool": "Jupyter"}
            }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/apps/v2/ws-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "appName": "galaxy-1",
                "appType": "GALAXY",
                "status": "PROVISIONING",
                "auditInfo": {"createdDate": "2024-05-02T10:00:00Z"}
            }
        ])))
        .mount(&server)
        .await;

    let snapshot = client_for(&server).fetch(&scope()).await.unwrap();

    assert_eq!(snapshot.len(), 2);
    let runtime = snapshot.get("7").expect("runtime keyed by id");
    assert_eq!(runtime.kind, ResourceKind::Runtime);
    assert_eq!(runtime.status, ResourceStatus::Running);
    let app = snapshot.get("galaxy-1").expect("app keyed by name");
    assert_eq!(app.status, ResourceStatus::Provisioning);
}

#[tokio::test]
async fn test_fetch_not_found_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("workspace not found"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch(&scope()).await.unwrap_err();
    assert!(err.is_not_found(), "404 should map to not-found, got {err}");
}

#[tokio::test]
async fn test_fetch_server_error_is_recoverable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch(&scope()).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(err.is_recoverable(), "5xx should be a recoverable request error");
}

#[tokio::test]
async fn test_fetch_malformed_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch(&scope()).await.unwrap_err();
    assert!(!err.is_recoverable());
}

fn errored_runtime() -> ResourceRecord {
    ResourceRecord::new("7", ResourceKind::Runtime, "runtime", ResourceStatus::Error, Utc::now())
        .with_name("saturn-7")
        .with_project("terra-proj")
        .with_staging_bucket("staging-7")
}

#[tokio::test]
async fn test_fetch_details_collects_messages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/google/v1/runtimes/terra-proj/saturn-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "runtimeName": "saturn-7",
            "errors": [
                {"errorMessage": "Userscript failed: exit 1", "errorCode": 3},
                {"errorMessage": "second"}
            ]
        })))
        .mount(&server)
        .await;

    let details = client_for(&server)
        .fetch_details(&errored_runtime())
        .await
        .unwrap();
    assert_eq!(
        details.error_messages,
        vec!["Userscript failed: exit 1".to_string(), "second".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_error_artifact_reads_staging_bucket() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/b/staging-7/o/userscript_output.txt"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pip: command not found\n"))
        .mount(&server)
        .await;

    let text = client_for(&server)
        .fetch_error_artifact(&errored_runtime(), "userscript_output.txt")
        .await
        .unwrap();
    assert_eq!(text, "pip: command not found\n");
}

#[tokio::test]
async fn test_fetch_error_artifact_without_bucket_fails() {
    let server = MockServer::start().await;
    let mut record = errored_runtime();
    record.staging_bucket = None;

    let result = client_for(&server)
        .fetch_error_artifact(&record, "userscript_output.txt")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_workspace_state_delete_failed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspaces/billing/my-ws"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "workspace": {"state": "DeleteFailed", "errorMessage": "bucket is locked"}
        })))
        .mount(&server)
        .await;

    let report = client_for(&server).workspace_state(&scope()).await.unwrap();
    assert_eq!(report.state, ResourceStatus::DeleteFailed);
    assert_eq!(report.error_message.as_deref(), Some("bucket is locked"));
}

#[tokio::test]
async fn test_workspace_state_gone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/workspaces/billing/my-ws"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).workspace_state(&scope()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_migrations() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/billing/v2/billing/bucketMigration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"namespace": "billing", "name": "a", "migrationStep": "ScheduledForMigration"},
            {"namespace": "billing", "name": "b", "migrationStep": "Finished", "outcome": "success"}
        ])))
        .mount(&server)
        .await;

    let reports = client_for(&server).migrations("billing").await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].step, MigrationStep::ScheduledForMigration);
    assert_eq!(reports[0].outcome, None);
    assert_eq!(reports[1].outcome, Some(MigrationOutcome::Success));
}
