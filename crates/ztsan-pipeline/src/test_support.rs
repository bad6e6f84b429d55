//! In-memory backend for unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ztsan_client::{ClientError, ClientResult, PipelineBackend};
use ztsan_types::{
    Ack, AnomalyReport, ConfigView, HealthView, MonitorReport, Node, NodeSpec, Preset, Stage,
    Status, SystemMode, TrustResult,
};

pub fn node(id: &str, ip: &str, stage: Stage) -> Node {
    let status = match stage {
        Stage::Verification | Stage::Scoring => Status::Pending,
        Stage::ActiveSession => Status::Active,
        Stage::Blocked => Status::Blocked,
    };
    raw_node(id, ip, Some(stage.as_str()), Some(status.as_str()))
}

pub fn raw_node(id: &str, ip: &str, stage: Option<&str>, status: Option<&str>) -> Node {
    Node {
        id: Some(id.to_string()),
        ip: Some(ip.to_string()),
        stage_raw: stage.map(str::to_string),
        status_raw: status.map(str::to_string),
        trust_score: Some(50),
        ..Node::default()
    }
}

fn offline() -> ClientError {
    ClientError::NetworkUnreachable {
        url: "http://fake/api".to_string(),
        reason: "connection failed".to_string(),
    }
}

fn not_found() -> ClientError {
    ClientError::BadStatus {
        status: 404,
        body: r#"{"message":"Node not found"}"#.to_string(),
    }
}

/// Stateful stand-in for the controller
#[derive(Default)]
pub struct FakeBackend {
    nodes: Mutex<Vec<Node>>,
    mode: Mutex<Option<SystemMode>>,
    list_delay: Mutex<Duration>,
    mutation_delay: Mutex<Duration>,
    offline: AtomicBool,
    pub fail_config: AtomicBool,
    pub fail_trust: AtomicBool,
    pub list_calls: AtomicUsize,
    pub mutation_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        let backend = Self::default();
        *backend.nodes.lock().unwrap() = nodes;
        backend
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = delay;
    }

    pub fn set_mutation_delay(&self, delay: Duration) {
        *self.mutation_delay.lock().unwrap() = delay;
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn insert(&self, node: Node) {
        self.nodes.lock().unwrap().push(node);
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.lock().unwrap().clone()
    }

    fn mode(&self) -> SystemMode {
        self.mode.lock().unwrap().unwrap_or(SystemMode::Demo)
    }

    async fn mutation(&self) -> ClientResult<()> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.mutation_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(())
    }

    fn update<F>(&self, node_id: &str, f: F) -> ClientResult<Node>
    where
        F: FnOnce(&mut Node),
    {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .iter_mut()
            .find(|n| n.id.as_deref() == Some(node_id))
            .ok_or_else(not_found)?;
        f(node);
        Ok(node.clone())
    }
}

#[async_trait]
impl PipelineBackend for FakeBackend {
    async fn list_nodes(&self) -> ClientResult<Vec<Node>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        // The answer reflects the state at request receipt.
        let nodes = self.nodes();
        let delay = *self.list_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(nodes)
    }

    async fn create_node(&self, spec: &NodeSpec) -> ClientResult<Node> {
        self.mutation().await?;
        let id = format!("node-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let stage = match spec {
            NodeSpec::Preset(p) if p.preset == Preset::Compromised => Stage::Blocked,
            NodeSpec::Preset(p) if p.preset == Preset::Healthy => Stage::ActiveSession,
            _ => Stage::Verification,
        };
        let created = node(&id, spec.ip(), stage);
        self.nodes.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn simulate_attack(&self, node_id: &str) -> ClientResult<Ack> {
        self.mutation().await?;
        let node = self.update(node_id, |n| {
            n.stage_raw = Some(Stage::Blocked.as_str().to_string());
            n.status_raw = Some(Status::Blocked.as_str().to_string());
            n.trust_score = Some(0);
        })?;
        Ok(Ack {
            message: Some("Attack Simulated! Node Blocked.".to_string()),
            node: Some(node),
        })
    }

    async fn calculate_trust(&self, node_id: &str) -> ClientResult<TrustResult> {
        self.mutation().await?;
        if self.fail_trust.load(Ordering::SeqCst) {
            return Err(ClientError::BadStatus {
                status: 500,
                body: "trust engine unavailable".to_string(),
            });
        }
        let node = self.update(node_id, |n| {
            n.stage_raw = Some(Stage::ActiveSession.as_str().to_string());
            n.status_raw = Some(Status::Active.as_str().to_string());
            n.trust_score = Some(88);
        })?;
        Ok(TrustResult {
            node,
            message: Some("Trust score calculated".to_string()),
            trust_breakdown: None,
        })
    }

    async fn monitor_behavior(&self, node_id: &str) -> ClientResult<MonitorReport> {
        self.mutation().await?;
        let node = self.update(node_id, |_| {})?;
        Ok(MonitorReport {
            node,
            suspicious_activities: vec!["Excessive file access".to_string()],
        })
    }

    async fn detect_anomalies(&self, node_id: &str) -> ClientResult<AnomalyReport> {
        self.update(node_id, |_| {})?;
        Ok(AnomalyReport {
            node_id: Some(node_id.to_string()),
            anomalies: Vec::new(),
            count: Some(0),
        })
    }

    async fn block_node(&self, node_id: &str, _reason: &str) -> ClientResult<Ack> {
        self.mutation().await?;
        self.update(node_id, |n| {
            n.stage_raw = Some(Stage::Blocked.as_str().to_string());
            n.status_raw = Some(Status::Blocked.as_str().to_string());
        })?;
        Ok(Ack {
            message: Some("Node blocked".to_string()),
            node: None,
        })
    }

    async fn unblock_node(&self, node_id: &str) -> ClientResult<Ack> {
        self.mutation().await?;
        self.update(node_id, |n| {
            n.stage_raw = Some(Stage::Verification.as_str().to_string());
            n.status_raw = Some(Status::Pending.as_str().to_string());
        })?;
        Ok(Ack::default())
    }

    async fn get_health(&self) -> ClientResult<HealthView> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(HealthView {
            ok: true,
            status: Some("online".to_string()),
            mode: Some(self.mode()),
            ..HealthView::default()
        })
    }

    async fn get_config(&self) -> ClientResult<ConfigView> {
        if self.offline.load(Ordering::SeqCst) || self.fail_config.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(ConfigView {
            mode: self.mode(),
            trust_thresholds: None,
            security: None,
        })
    }

    async fn set_mode(&self, mode: SystemMode) -> ClientResult<Ack> {
        self.mutation().await?;
        *self.mode.lock().unwrap() = Some(mode);
        Ok(Ack {
            message: Some(format!("System mode changed to {}", mode)),
            node: None,
        })
    }
}
