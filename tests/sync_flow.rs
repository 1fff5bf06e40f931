//! End-to-end ingestion and sync flows against a mock remote store.

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chemsync::config::{EngineConfig, RemoteConfig};
use chemsync::errors::EngineError;
use chemsync::sync::{RemoteSync, SyncOrchestrator, SyncState};
use chemsync::types::CellValue;

const SCENARIO_CSV: &[u8] = b"name,Type,Press,Temp\nA,Pump,16,40\nB,Valve,5,50\n";

fn remote_config(server: &MockServer) -> RemoteConfig {
    RemoteConfig::new("test-key", "test-project").with_endpoints(
        format!("{}/accounts", server.uri()),
        format!("{}/docs", server.uri()),
    )
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "idToken": "token-1",
            "localId": "uid-1",
        })))
        .mount(server)
        .await;
}

async fn mount_empty_query(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/docs:runQuery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn end_to_end_ingest_classify_and_upload() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_empty_query(&server).await;
    Mock::given(method("POST"))
        .and(path("/docs/datasets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/test-project/databases/(default)/documents/datasets/doc-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::local(tmp.path()).with_remote(remote_config(&server));
    let orchestrator = SyncOrchestrator::new(config).unwrap();

    let session = orchestrator.login("ops@plant.example", "secret").await.unwrap();
    let outcome = orchestrator
        .ingest_bytes("plant.csv", SCENARIO_CSV, Some(&session))
        .await
        .unwrap();

    // Normalization: Press → pressure, Temp → temp, status filled in
    let rows = &outcome.dataset.records;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].pressure, CellValue::Int(16));
    assert_eq!(rows[0].status, CellValue::Text("Critical".into()));
    assert_eq!(rows[1].status, CellValue::Text("Stable".into()));

    let summary = &outcome.dataset.summary;
    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.type_counts.get("Pump"), Some(&1));
    assert_eq!(summary.type_counts.get("Valve"), Some(&1));
    assert_eq!(
        summary.columns,
        vec!["name", "type", "flow", "pressure", "temp", "status"]
    );

    match &outcome.remote {
        RemoteSync::Synced(doc_id) => assert_eq!(doc_id.0, "doc-1"),
        other => panic!("expected synced outcome, got {other:?}"),
    }
    assert_eq!(orchestrator.state(), SyncState::Synced);
}

#[tokio::test]
async fn upload_failure_never_rolls_back_local_state() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/docs/datasets"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::local(tmp.path()).with_remote(remote_config(&server));
    let orchestrator = SyncOrchestrator::new(config).unwrap();

    let session = orchestrator.login("ops@plant.example", "secret").await.unwrap();
    let outcome = orchestrator
        .ingest_bytes("plant.csv", SCENARIO_CSV, Some(&session))
        .await
        .unwrap();

    assert!(matches!(outcome.remote, RemoteSync::Failed(_)));
    assert_eq!(orchestrator.state(), SyncState::Persisted);

    // The dataset is durable locally despite the failed upload
    let history = orchestrator.local_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].filename, "plant.csv");
    assert_eq!(history[0].item_count, 2);
}

#[tokio::test]
async fn fetch_history_decodes_remote_documents() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/docs:runQuery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/datasets/doc-9",
                    "fields": {
                        "filename": { "stringValue": "shift-a.csv" },
                        "createdAt": { "timestampValue": "2026-08-06T10:00:00Z" },
                        "parsedData": { "arrayValue": { "values": [
                            { "mapValue": { "fields": {
                                "name": { "stringValue": "P-101" },
                                "pressure": { "doubleValue": 12.5 },
                                "status": { "stringValue": "Warning" },
                                // Unrecognized kind: the field is dropped
                                "flow": { "booleanValue": true }
                            } } }
                        ] } }
                    }
                }
            },
            // Read-time-only entries carry no document and are skipped
            { "readTime": "2026-08-06T10:00:01Z" }
        ])))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::local(tmp.path()).with_remote(remote_config(&server));
    let orchestrator = SyncOrchestrator::new(config).unwrap();

    let session = orchestrator.login("ops@plant.example", "secret").await.unwrap();
    let history = orchestrator.fetch_history(&session).await;

    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry.filename, "shift-a.csv");
    assert_eq!(entry.item_count, 1);
    assert_eq!(entry.records[0].name, CellValue::Text("P-101".into()));
    assert_eq!(entry.records[0].pressure, CellValue::Float(12.5));
    assert_eq!(entry.records[0].flow, CellValue::Empty);
}

#[tokio::test]
async fn fetch_history_transport_failure_yields_empty_history() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/docs:runQuery"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::local(tmp.path()).with_remote(remote_config(&server));
    let orchestrator = SyncOrchestrator::new(config).unwrap();

    let session = orchestrator.login("ops@plant.example", "secret").await.unwrap();
    assert!(orchestrator.fetch_history(&session).await.is_empty());
}

#[tokio::test]
async fn malformed_input_leaves_no_orphaned_state() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = SyncOrchestrator::new(EngineConfig::local(tmp.path())).unwrap();

    let bytes = [0xff, 0xfe, 0x00, b'\n', 0x80];
    let result = orchestrator.ingest_bytes("broken.csv", &bytes, None).await;
    assert!(matches!(result, Err(EngineError::MalformedInput(_))));
    assert_eq!(orchestrator.state(), SyncState::Idle);

    assert!(orchestrator.local_history().await.unwrap().is_empty());
    let dataset_dirs = std::fs::read_dir(tmp.path().join("datasets")).unwrap().count();
    assert_eq!(dataset_dirs, 0);
}

#[tokio::test]
async fn local_retention_caps_at_five_newest() {
    let tmp = TempDir::new().unwrap();
    let orchestrator = SyncOrchestrator::new(EngineConfig::local(tmp.path())).unwrap();

    for i in 1..=7 {
        let outcome = orchestrator
            .ingest_bytes(&format!("shift-{i}.csv"), SCENARIO_CSV, None)
            .await
            .unwrap();
        assert!(matches!(outcome.remote, RemoteSync::Skipped(_)));
    }

    let history = orchestrator.local_history().await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].filename, "shift-7.csv");
    assert_eq!(history[4].filename, "shift-3.csv");

    // Evicted datasets are physically gone from disk
    let dataset_dirs = std::fs::read_dir(tmp.path().join("datasets")).unwrap().count();
    assert_eq!(dataset_dirs, 5);
}

#[tokio::test]
async fn oversized_payload_is_rejected_before_upload() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    // The insert endpoint must never be hit for an oversized payload
    Mock::given(method("POST"))
        .and(path("/docs/datasets"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut csv = String::from("name\n");
    let cell = "x".repeat(1000);
    for _ in 0..1200 {
        csv.push_str(&cell);
        csv.push('\n');
    }

    let tmp = TempDir::new().unwrap();
    let config = EngineConfig::local(tmp.path()).with_remote(remote_config(&server));
    let orchestrator = SyncOrchestrator::new(config).unwrap();

    let session = orchestrator.login("ops@plant.example", "secret").await.unwrap();
    let outcome = orchestrator
        .ingest_bytes("huge.csv", csv.as_bytes(), Some(&session))
        .await
        .unwrap();

    match outcome.remote {
        RemoteSync::Failed(EngineError::Capacity { size, limit }) => {
            assert!(size > limit);
        }
        other => panic!("expected capacity rejection, got {other:?}"),
    }
    // Local persistence is unaffected by the remote rejection
    assert_eq!(orchestrator.local_history().await.unwrap().len(), 1);
}
