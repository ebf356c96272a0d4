// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use tempfile::TempDir;
use tokio::sync::broadcast;
use vitalwatch::config::AppConfig;
use vitalwatch::export::TextRenderer;
use vitalwatch::models::LiveUpdate;
use vitalwatch::prediction::PredictionClient;
use vitalwatch::readings_repo::ReadingsRepo;
use vitalwatch::relay::ReportRelay;
use vitalwatch::routes::{self, AppDeps};
use vitalwatch::session::{AccessGate, Session};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UNREACHABLE: &str = "http://127.0.0.1:9";

struct TestApp {
    app: axum::Router,
    tx: broadcast::Sender<LiveUpdate>,
    _dir: TempDir,
}

async fn test_app_with(config: AppConfig, collaborator_uri: &str) -> TestApp {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("vitals.db");
    let readings_repo = Arc::new(
        ReadingsRepo::connect(db_path.to_str().unwrap(), 30)
            .await
            .unwrap(),
    );
    readings_repo.init().await.unwrap();
    let session = Arc::new(
        Session::load(readings_repo.kv_store(), AccessGate::new(config.access.code.clone()))
            .await
            .unwrap(),
    );
    let timeout = std::time::Duration::from_secs(5);
    let relay = Arc::new(
        ReportRelay::new(&format!("{}/send-report", collaborator_uri), timeout).unwrap(),
    );
    let prediction = Arc::new(
        PredictionClient::new(&format!("{}/predict", collaborator_uri), timeout).unwrap(),
    );
    let (tx, _) = broadcast::channel(config.live.broadcast_capacity);
    let app = routes::app(AppDeps {
        live_tx: tx.clone(),
        readings_repo,
        session,
        relay,
        prediction,
        renderer: Arc::new(TextRenderer),
        live_connections: Arc::new(AtomicUsize::new(0)),
        readings_ingested_total: Arc::new(AtomicU64::new(0)),
        config,
    });
    TestApp {
        app,
        tx,
        _dir: dir,
    }
}

async fn test_app() -> TestApp {
    test_app_with(
        AppConfig::load_from_str(common::TEST_CONFIG).unwrap(),
        UNREACHABLE,
    )
    .await
}

async fn logged_in(server: &TestServer) {
    server
        .post("/api/login")
        .json(&serde_json::json!({ "code": "letmein" }))
        .await
        .assert_status_ok();
}

fn raw_reading(minutes_ago: i64, temp: f64, spo2: f64, position: &str) -> serde_json::Value {
    serde_json::json!({
        "recorded_at": (Utc::now() - Duration::minutes(minutes_ago)).to_rfc3339(),
        "temperature": temp,
        "heart_rate": 72,
        "spo2": spo2,
        "position": position,
    })
}

#[tokio::test]
async fn test_root_endpoint() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("vitalwatch: patient vitals monitor");
}

#[tokio::test]
async fn test_version_endpoint() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("vitalwatch")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_protected_routes_require_access_code() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();

    let response = server.get("/api/vitals/latest").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"], "access code required");

    let response = server
        .post("/api/login")
        .json(&serde_json::json!({ "code": "wrong" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    logged_in(&server).await;
    server.get("/api/vitals/latest").await.assert_status_ok();

    let response = server.post("/api/logout").await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let response = server.get("/api/vitals/latest").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_latest_without_data_reports_missing_reading() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let json: serde_json::Value = server.get("/api/vitals/latest").await.json();
    assert!(json["reading"].is_null());
    let alerts = json["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["message"], "No vitals data available.");
    assert_eq!(alerts[0]["severity"], "low");
}

#[tokio::test]
async fn test_ingest_then_latest_with_alerts() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let response = server
        .post("/api/readings")
        .json(&raw_reading(1, 38.4, 93.0, "Prone"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let json: serde_json::Value = server.get("/api/vitals/latest").await.json();
    assert_eq!(json["reading"]["temperatureC"], 38.4);
    assert_eq!(json["reading"]["posture"], "Prone");
    let kinds: Vec<&str> = json["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["condition"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["highTemperature", "lowSpo2", "abnormalPosture"]);
}

#[tokio::test]
async fn test_ingest_rejects_malformed_reading() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let response = server
        .post("/api/readings")
        .json(&serde_json::json!({ "recorded_at": "2026-03-01T08:00:00Z", "spo2": 140 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("spo2"));
}

#[tokio::test]
async fn test_trends_and_posture_over_window() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    for (i, p) in ["Right", "Right", "Left", "Supine", "Right", "Left", "Right"]
        .iter()
        .enumerate()
    {
        server
            .post("/api/readings")
            .json(&raw_reading(70 - i as i64 * 10, 36.5, 97.0, p))
            .await
            .assert_status(StatusCode::CREATED);
    }
    // Outside the default 7-day window.
    server
        .post("/api/readings")
        .json(&raw_reading(60 * 24 * 10, 39.0, 90.0, "Left"))
        .await
        .assert_status(StatusCode::CREATED);

    let trends: serde_json::Value = server.get("/api/trends").await.json();
    assert_eq!(trends["averageTemperatureC"], 36.5);
    assert_eq!(trends["mostCommonPosture"], "Right");
    assert_eq!(trends["anyFlagged"], false);

    let posture: serde_json::Value = server.get("/api/posture").await.json();
    assert_eq!(posture["total"], 7);
    let pct: Vec<u64> = posture["buckets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["percentOfTotal"].as_u64().unwrap())
        .collect();
    assert_eq!(pct, vec![57, 29, 14]);

    let all: serde_json::Value = server.get("/api/readings?days=30").await.json();
    assert_eq!(all.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_window_query_validation() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let response = server
        .get("/api/trends?from=2026-03-05T00:00:00Z&to=2026-03-01T00:00:00Z")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // A window this long cannot be represented; it must be rejected, not crash the handler.
    for uri in ["/api/readings?days=4000000000", "/api/posture?days=4294967295"] {
        let response = server.get(uri).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", uri);
        let json: serde_json::Value = response.json();
        assert!(json["error"].as_str().unwrap().contains("days out of range"));
    }
    let response = server
        .post("/api/report/send")
        .json(&serde_json::json!({ "days": 4000000000u32 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server.get("/api/trends").await;
    let json: serde_json::Value = response.json();
    assert!(json["averageTemperatureC"].is_null());
    assert!(json["mostCommonPosture"].is_null());
    assert_eq!(json["anyFlagged"], false);
}

#[tokio::test]
async fn test_report_json_download_and_csv() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;
    server
        .post("/api/readings")
        .json(&raw_reading(5, 36.7, 98.0, "Supine"))
        .await
        .assert_status(StatusCode::CREATED);

    let report: serde_json::Value = server.get("/api/report").await.json();
    assert_eq!(report["title"], "Patient Health Report");
    assert!(report["generatedAt"].is_string());
    assert_eq!(report["sections"][0]["title"], "Patient Information");

    let response = server.get("/api/report/download").await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"health_report_Jane_Doe.txt\""
    );
    assert!(response.text().contains("Most Common Sleep Position: Supine"));

    let response = server.get("/api/report/csv").await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "text/csv; charset=utf-8"
    );
    let csv = response.text();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Time,Temperature,Position");
    assert!(lines[1].ends_with(",36.7,Supine"));
}

#[tokio::test]
async fn test_send_report_through_relay() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send-report"))
        .and(body_partial_json(serde_json::json!({
            "email": "doctor@example.com",
            "patientId": "P-1001",
            "remarks": "Night summary",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
        .expect(1)
        .mount(&mock)
        .await;

    let config = AppConfig::load_from_str(common::TEST_CONFIG).unwrap();
    let t = test_app_with(config, &mock.uri()).await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let response = server
        .post("/api/report/send")
        .json(&serde_json::json!({ "remarks": "Night summary" }))
        .await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_send_report_relay_failure_is_inline_error() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "success": false, "error": "mailbox full" }),
        ))
        .mount(&mock)
        .await;

    let config = AppConfig::load_from_str(common::TEST_CONFIG).unwrap();
    let t = test_app_with(config, &mock.uri()).await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let response = server
        .post("/api/report/send")
        .json(&serde_json::json!({ "recipientEmail": "nurse@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = response.json();
    assert_eq!(
        json["error"],
        "Failed to send: relay rejected report: mailbox full"
    );
}

#[tokio::test]
async fn test_send_report_without_patient_is_conflict() {
    let idx = common::TEST_CONFIG.find("[patient]").unwrap();
    let config = AppConfig::load_from_str(&common::TEST_CONFIG[..idx]).unwrap();
    let t = test_app_with(config, UNREACHABLE).await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let response = server
        .post("/api/report/send")
        .json(&serde_json::json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    // Reduced layout is still downloadable.
    let report: serde_json::Value = server.get("/api/report").await.json();
    assert_eq!(report["sections"][0]["title"], "Vitals Overview");
    let response = server.get("/api/report/download").await;
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"health_report.txt\""
    );
}

#[tokio::test]
async fn test_notes_roundtrip() {
    let t = test_app().await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let response = server
        .post("/api/notes")
        .json(&serde_json::json!({ "text": "  " }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    server
        .post("/api/notes")
        .json(&serde_json::json!({ "text": "Gave water at 1am" }))
        .await
        .assert_status_ok();
    server
        .post("/api/notes")
        .json(&serde_json::json!({ "text": "Restless after 4am" }))
        .await
        .assert_status_ok();

    let json: serde_json::Value = server.get("/api/notes").await.json();
    assert_eq!(
        json["notes"],
        serde_json::json!(["Restless after 4am", "Gave water at 1am"])
    );
}

#[tokio::test]
async fn test_predict_forwards_upload() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "prediction": "normal",
            "probabilities": { "normal": 0.75, "pneumonia": 0.25 },
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let config = AppConfig::load_from_str(common::TEST_CONFIG).unwrap();
    let t = test_app_with(config, &mock.uri()).await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0xff, 0xd8, 0xff])
            .file_name("scan.jpg")
            .mime_type("image/jpeg"),
    );
    let response = server.post("/api/predict").multipart(form).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["prediction"], "normal");
    assert_eq!(json["probabilities"]["pneumonia"], 0.25);

    let missing = MultipartForm::new().add_text("other", "x");
    let response = server.post("/api/predict").multipart(missing).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_service_error_is_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock)
        .await;

    let config = AppConfig::load_from_str(common::TEST_CONFIG).unwrap();
    let t = test_app_with(config, &mock.uri()).await;
    let server = TestServer::try_new(t.app).unwrap();
    logged_in(&server).await;

    let form = MultipartForm::new().add_part("file", Part::bytes(vec![1, 2, 3]).file_name("a.png"));
    let response = server.post("/api/predict").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"], "Prediction API error (HTTP 500)");
}

// --- WebSocket message tests (require http_transport + ws feature) ---
// Receive until we get valid JSON with the wanted type (server may send Ping first).

async fn receive_message_of_type(
    ws: &mut axum_test::TestWebSocket,
    wanted: &str,
) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&text) {
            if v["type"] == wanted {
                return v;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} message",
            wanted
        );
    }
}

#[tokio::test]
async fn test_ws_vitals_welcome_then_live_reading() {
    let t = test_app().await;
    let tx = t.tx.clone();
    let server = TestServer::builder().http_transport().try_build(t.app).unwrap();
    logged_in(&server).await;

    let mut ws = server
        .get_websocket("/ws/vitals")
        .await
        .into_websocket()
        .await;

    let welcome = receive_message_of_type(&mut ws, "latest").await;
    assert!(welcome["reading"].is_null());
    assert_eq!(welcome["alerts"][0]["message"], "No vitals data available.");
    assert_eq!(tx.receiver_count(), 1);

    server
        .post("/api/readings")
        .json(&raw_reading(0, 37.6, 98.0, "Left"))
        .await
        .assert_status(StatusCode::CREATED);

    let update = receive_message_of_type(&mut ws, "reading").await;
    assert_eq!(update["reading"]["temperatureC"], 37.6);
    assert_eq!(update["alerts"][0]["condition"]["kind"], "highTemperature");
}

#[tokio::test]
async fn test_ws_vitals_requires_access() {
    let t = test_app().await;
    let server = TestServer::builder().http_transport().try_build(t.app).unwrap();
    let response = server.get_websocket("/ws/vitals").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}
