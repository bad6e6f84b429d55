//! Client Integration Tests
//!
//! Runs the client against an in-process axum backend bound to an
//! ephemeral port, covering the happy paths and each failure kind.

use std::time::Duration;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use ztsan_client::{BackendClient, ClientConfig, ClientError, FailureKind, PipelineBackend};
use ztsan_types::{NodeSpec, Preset, Stage, SystemMode};

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn client_for(base_url: &str) -> BackendClient {
    BackendClient::new(ClientConfig {
        base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(2),
        probe_timeout: Duration::from_millis(200),
    })
    .unwrap()
}

async fn list_nodes() -> Json<Value> {
    Json(json!([
        {"id": "n1", "ip": "10.0.0.5", "stage": "Verification", "status": "pending", "trustScore": 50},
        "garbage",
        {"id": "n2", "ip": "10.0.0.6", "stage": "Active Session", "status": "active", "trustScore": 91.4}
    ]))
}

async fn create_node(Json(body): Json<Value>) -> impl IntoResponse {
    let ip = body.get("ip").and_then(Value::as_str).unwrap_or_default();
    if ip.is_empty() {
        return (StatusCode::BAD_REQUEST, "ip is required").into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": "new-node",
            "ip": ip,
            "stage": "Verification",
            "status": "pending",
            "preset": body.get("preset").cloned().unwrap_or(Value::Null)
        })),
    )
        .into_response()
}

async fn simulate_attack(Json(body): Json<Value>) -> impl IntoResponse {
    match body.get("nodeId").and_then(Value::as_str) {
        Some("n2") => (
            StatusCode::OK,
            Json(json!({"message": "Attack Simulated! Node Blocked.", "node": {"id": "n2", "stage": "Blocked"}})),
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Node not found"}))).into_response(),
    }
}

async fn anomalies(Path(node_id): Path<String>) -> Json<Value> {
    Json(json!({"nodeId": node_id, "anomalies": ["Brute force attack detected"], "count": 1}))
}

async fn set_mode(Json(body): Json<Value>) -> impl IntoResponse {
    match body.get("mode").and_then(Value::as_str) {
        Some(mode @ ("demo" | "production")) => (
            StatusCode::OK,
            Json(json!({"message": format!("System mode changed to {}", mode), "mode": mode})),
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid mode. Must be \"demo\" or \"production\""})),
        )
            .into_response(),
    }
}

async fn slow_config() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(800)).await;
    Json(json!({"mode": "demo"}))
}

fn backend_router() -> Router {
    Router::new()
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route("/api/trust/simulate-attack", post(simulate_attack))
        .route("/api/trust/anomalies/:node_id", get(anomalies))
        .route("/api/config", get(slow_config))
        .route("/api/config/mode", post(set_mode))
        .route(
            "/api/health",
            get(|| async { Json(json!({"status": "online", "mode": "demo", "services": {"database": "operational"}})) }),
        )
}

#[tokio::test]
async fn test_list_nodes_skips_non_objects() {
    let base = spawn_backend(backend_router()).await;
    let nodes = client_for(&base).list_nodes().await.unwrap();

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].stage(), Some(Stage::Verification));
    assert_eq!(nodes[1].trust_score, Some(91));
}

#[tokio::test]
async fn test_create_preset_node() {
    let base = spawn_backend(backend_router()).await;
    let node = client_for(&base)
        .create_node(&NodeSpec::preset("10.0.0.5", Preset::Healthy))
        .await
        .unwrap();
    assert_eq!(node.ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(node.id.as_deref(), Some("new-node"));
}

#[tokio::test]
async fn test_bad_status_keeps_body_verbatim() {
    let base = spawn_backend(backend_router()).await;
    let err = client_for(&base).simulate_attack("missing").await.unwrap_err();

    match &err {
        ClientError::BadStatus { status, body } => {
            assert_eq!(*status, 404);
            assert_eq!(body, r#"{"message":"Node not found"}"#);
        }
        other => panic!("expected BadStatus, got {:?}", other),
    }
    assert_eq!(err.kind(), FailureKind::BadStatus);
}

#[tokio::test]
async fn test_simulate_attack_ack() {
    let base = spawn_backend(backend_router()).await;
    let ack = client_for(&base).simulate_attack("n2").await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Attack Simulated! Node Blocked."));
    assert_eq!(ack.node.and_then(|n| n.stage()), Some(Stage::Blocked));
}

#[tokio::test]
async fn test_set_mode_ack() {
    let base = spawn_backend(backend_router()).await;
    let client = client_for(&base);
    let ack = client.set_mode(SystemMode::Production).await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("System mode changed to production"));
}

#[tokio::test]
async fn test_anomalies_path_parameter() {
    let base = spawn_backend(backend_router()).await;
    let report = client_for(&base).detect_anomalies("n2").await.unwrap();
    assert_eq!(report.node_id.as_deref(), Some("n2"));
    assert_eq!(report.anomalies, vec!["Brute force attack detected".to_string()]);
}

#[tokio::test]
async fn test_anomalies_node_id_is_one_encoded_segment() {
    let base = spawn_backend(backend_router()).await;
    let report = client_for(&base).detect_anomalies("a b/c").await.unwrap();
    assert_eq!(report.node_id.as_deref(), Some("a b/c"));
}

#[tokio::test]
async fn test_health_probe() {
    let base = spawn_backend(backend_router()).await;
    let client = client_for(&base);
    let health = client.get_health().await.unwrap();
    assert!(health.ok);
    assert_eq!(health.mode, Some(SystemMode::Demo));
    assert!(client.is_available().await);
}

#[tokio::test]
async fn test_probe_timeout_is_unreachable() {
    let base = spawn_backend(backend_router()).await;
    let err = client_for(&base).get_config().await.unwrap_err();
    assert!(err.is_offline(), "expected timeout, got {:?}", err);
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{}/api", addr));
    let err = client.list_nodes().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::NetworkUnreachable);
    assert!(!client.is_available().await);
}

#[tokio::test]
async fn test_non_array_node_list_is_decode_error() {
    let router = Router::new().route("/api/nodes", get(|| async { Json(json!({"nodes": []})) }));
    let base = spawn_backend(router).await;
    let err = client_for(&base).list_nodes().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Decode);
}
