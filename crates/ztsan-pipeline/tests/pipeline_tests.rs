//! Pipeline End-to-End Tests
//!
//! Wires the real HTTP client, poll loop and dispatcher to an in-process
//! axum controller that keeps its nodes and mode in memory.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use ztsan_client::{BackendClient, ClientConfig, PipelineBackend};
use ztsan_pipeline::{
    CommandDispatcher, CreateOptions, LinkState, PipelineView, PollConfig, PollLoop, Snapshot,
};
use ztsan_types::{NodeSpec, Preset, Stage, SystemMode};

#[derive(Default)]
struct Controller {
    nodes: Vec<Value>,
    mode: String,
}

type Shared = Arc<Mutex<Controller>>;

async fn list_nodes(State(state): State<Shared>) -> Json<Value> {
    Json(Value::Array(state.lock().unwrap().nodes.clone()))
}

async fn create_node(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    let ip = body.get("ip").and_then(Value::as_str).unwrap_or_default().to_string();
    let (stage, status, score) = match body.get("preset").and_then(Value::as_str) {
        Some("healthy") => ("Active Session", "active", 92),
        Some("compromised") => ("Blocked", "blocked", 15),
        _ => ("Verification", "pending", 50),
    };
    let node = json!({
        "id": format!("node-{}", state.nodes.len() + 1),
        "ip": ip,
        "stage": stage,
        "status": status,
        "trustScore": score,
    });
    state.nodes.push(node.clone());
    (StatusCode::CREATED, Json(node))
}

async fn get_config(State(state): State<Shared>) -> Json<Value> {
    let mode = state.lock().unwrap().mode.clone();
    Json(json!({
        "mode": mode,
        "trustThresholds": {"fullAccess": 80, "limitedAccess": 60, "restrictedAccess": 40, "blocked": 0}
    }))
}

async fn set_mode(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    match body.get("mode").and_then(Value::as_str) {
        Some(mode @ ("demo" | "production")) => {
            state.lock().unwrap().mode = mode.to_string();
            (StatusCode::OK, Json(json!({"message": format!("System mode changed to {}", mode)})))
        }
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid mode"}))),
    }
}

async fn spawn_controller() -> String {
    let state: Shared = Arc::new(Mutex::new(Controller {
        nodes: Vec::new(),
        mode: "demo".to_string(),
    }));
    let router = Router::new()
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route("/api/config", get(get_config))
        .route("/api/config/mode", post(set_mode))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn start(base_url: &str) -> (Arc<BackendClient>, PollLoop, CommandDispatcher) {
    let client = Arc::new(BackendClient::new(ClientConfig::new(base_url)).unwrap());
    let poll = PollLoop::spawn(
        client.clone(),
        PollConfig {
            interval: Duration::from_millis(200),
        },
        CancellationToken::new(),
    );
    let dispatcher = CommandDispatcher::new(client.clone(), poll.handle());
    (client, poll, dispatcher)
}

async fn wait_until<F>(poll: &PollLoop, mut predicate: F) -> Arc<Snapshot>
where
    F: FnMut(&Snapshot) -> bool,
{
    let mut rx = poll.handle().subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if predicate(&snapshot) {
                return snapshot;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("snapshot condition not reached")
}

#[tokio::test]
async fn test_created_node_appears_on_next_poll() {
    let base = spawn_controller().await;
    let (_, poll, dispatcher) = start(&base);

    let initial = wait_until(&poll, |s| s.is_online()).await;
    assert!(PipelineView::from_snapshot(&initial).is_empty());

    dispatcher
        .create_node(NodeSpec::preset("10.0.0.5", Preset::Healthy), CreateOptions::default())
        .await
        .unwrap();

    let snapshot = wait_until(&poll, |s| !s.nodes.is_empty()).await;
    let view = PipelineView::from_snapshot(&snapshot);
    let active = view.bucket(Stage::ActiveSession);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(view.counts.active, 1);

    poll.shutdown().await;
}

#[tokio::test]
async fn test_set_mode_reflected_in_config_and_snapshot() {
    let base = spawn_controller().await;
    let (client, poll, dispatcher) = start(&base);
    wait_until(&poll, |s| s.mode == Some(SystemMode::Demo)).await;

    dispatcher.set_mode(SystemMode::Production).await.unwrap();

    assert_eq!(client.get_config().await.unwrap().mode, SystemMode::Production);
    wait_until(&poll, |s| s.mode == Some(SystemMode::Production)).await;

    poll.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_backend_publishes_offline() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (_, poll, _) = start(&format!("http://{}/api", addr));
    let first = wait_until(&poll, |s| s.version >= 1).await;
    assert!(matches!(first.link, LinkState::Offline { .. }));

    let later = wait_until(&poll, |s| s.version >= 3).await;
    assert!(later.is_stale());
    assert!(later.nodes.is_empty());

    poll.shutdown().await;
}
