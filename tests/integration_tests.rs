// Integration tests: admin HTTP endpoints over a temp store and a scripted source

mod common;

use axum_test::TestServer;
use candle_seeder::config::SeedConfig;
use candle_seeder::routes;
use candle_seeder::seed::SeedService;
use candle_seeder::store::SeedStore;
use common::*;
use std::sync::Arc;
use tempfile::TempDir;

async fn test_server(symbols: &[&str]) -> (TempDir, Arc<SeedStore>, Arc<ScriptedSource>, TestServer) {
    let (dir, store) = temp_store().await;
    store.register_symbols(&strings(symbols)).await.unwrap();
    let source = Arc::new(ScriptedSource::empty());
    let defaults = SeedConfig {
        rate_limit_microseconds: 0,
        ..SeedConfig::default()
    };
    let service = Arc::new(SeedService::new(
        store.clone(),
        scheduler_for(&store, source.clone()),
        store.clone(),
        store.clone(),
        defaults,
    ));
    let server = TestServer::new(routes::app(service, store.clone()));
    (dir, store, source, server)
}

#[tokio::test]
async fn test_version_endpoint() {
    let (_dir, _store, _source, server) = test_server(&[]).await;
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("candle_seeder")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_start_without_symbols_is_bad_request() {
    let (_dir, _store, _source, server) = test_server(&[]).await;

    let response = server
        .post("/api/seed/start")
        .json(&serde_json::json!({}))
        .await;

    response.assert_status_bad_request();
    let json: serde_json::Value = response.json();
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("no symbols registered")
    );
}

#[tokio::test]
async fn test_start_then_status() {
    let (_dir, _store, _source, server) = test_server(&["AAPL", "MSFT"]).await;

    let response = server
        .post("/api/seed/start")
        .json(&serde_json::json!({
            "mode": "date_range",
            "fromTime": 1_650_000_000,
            "toTime": 1_600_000_000,
            "timeframes": ["1D"]
        }))
        .await;
    response.assert_status_ok();
    let started: serde_json::Value = response.json();
    assert_eq!(started["tasksCreated"], 2);
    assert_eq!(started["constraints"]["fromTime"], 1_600_000_000);
    assert_eq!(started["constraints"]["mode"], "date_range");

    let status: serde_json::Value = server.get("/api/seed/status").await.json();
    assert_eq!(status["paused"], false);
    assert_eq!(status["tasks"]["pending"], 2);
    assert_eq!(status["settings"]["timeframes"], serde_json::json!(["1D"]));
}

#[tokio::test]
async fn test_run_endpoint_returns_report() {
    let (_dir, _store, source, server) = test_server(&["AAPL"]).await;
    server
        .post("/api/seed/start")
        .json(&serde_json::json!({}))
        .await
        .assert_status_ok();

    let response = server.post("/api/seed/run").await;

    response.assert_status_ok();
    let report: serde_json::Value = response.json();
    assert_eq!(report["outcome"], "completed");
    assert_eq!(report["processed"], 1);
    assert_eq!(report["done"], 1);
    assert_eq!(source.calls().len(), 1);
}

#[tokio::test]
async fn test_pause_blocks_runs_until_resume() {
    let (_dir, store, source, server) = test_server(&["AAPL"]).await;
    server
        .post("/api/seed/start")
        .json(&serde_json::json!({}))
        .await
        .assert_status_ok();

    server.post("/api/seed/pause").await.assert_status_ok();
    assert!(store.is_paused().await.unwrap());
    let report: serde_json::Value = server.post("/api/seed/run").await.json();
    assert_eq!(report["outcome"], "paused");
    assert!(source.calls().is_empty());

    server.post("/api/seed/resume").await.assert_status_ok();
    let report: serde_json::Value = server.post("/api/seed/run").await.json();
    assert_eq!(report["outcome"], "completed");
}

#[tokio::test]
async fn test_settings_update_is_returned_and_persisted() {
    let (_dir, _store, _source, server) = test_server(&[]).await;

    let response = server
        .put("/api/seed/settings")
        .json(&serde_json::json!({ "tasksPerRun": 3, "requestLimit": 0 }))
        .await;

    response.assert_status_ok();
    let settings: serde_json::Value = response.json();
    assert_eq!(settings["tasksPerRun"], 3);
    assert_eq!(settings["requestLimit"], 5000);
    let status: serde_json::Value = server.get("/api/seed/status").await.json();
    assert_eq!(status["settings"]["tasksPerRun"], 3);
}

#[tokio::test]
async fn test_audit_endpoint_lists_newest_first() {
    let (_dir, _store, _source, server) = test_server(&["AAPL"]).await;
    server
        .post("/api/seed/start")
        .json(&serde_json::json!({}))
        .await
        .assert_status_ok();
    server.post("/api/seed/pause").await.assert_status_ok();

    let response = server
        .get("/api/seed/audit")
        .add_query_param("limit", 1)
        .await;

    response.assert_status_ok();
    let entries: serde_json::Value = response.json();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["kind"], "seed_paused");
}

#[tokio::test]
async fn test_add_symbols_endpoint_extends_running_seed() {
    let (_dir, store, _source, server) = test_server(&["AAPL"]).await;
    server
        .post("/api/seed/start")
        .json(&serde_json::json!({}))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/seed/symbols")
        .json(&serde_json::json!({ "symbols": ["MSFT", "AAPL"] }))
        .await;

    response.assert_status_ok();
    let added: serde_json::Value = response.json();
    assert_eq!(added["symbolsRegistered"], 1);
    assert_eq!(added["tasksCreated"], 1);
    assert!(store.find_task("MSFT", "1D").await.unwrap().is_some());
    let status: serde_json::Value = server.get("/api/seed/status").await.json();
    assert_eq!(status["tasks"]["pending"], 2);
}

#[tokio::test]
async fn test_add_symbols_endpoint_rejects_empty_list() {
    let (_dir, _store, _source, server) = test_server(&[]).await;

    let response = server
        .post("/api/seed/symbols")
        .json(&serde_json::json!({ "symbols": [] }))
        .await;

    response.assert_status_bad_request();
}
