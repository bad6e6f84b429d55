//! reqwest-backed implementation of the controller contract

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use ztsan_types::{
    Ack, AnomalyReport, ConfigView, HealthView, ModeRequest, MonitorReport, Node, NodeRef,
    NodeSpec, SystemMode, TrustResult,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::PipelineBackend;

/// HTTP client for the controller API
///
/// One method per endpoint. No call is retried here; the poll loop owns the
/// only retry policy.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
    probe_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let base_url = config.normalized_base()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self {
            base_url,
            http,
            probe_timeout: config.probe_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the backend answers `/health` at all
    pub async fn is_available(&self) -> bool {
        self.health().await.is_ok()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the body text of a 2xx response
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Option<Duration>,
    ) -> ClientResult<(String, String)> {
        let url = self.url(path);
        let mut request: RequestBuilder = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| unreachable(&url, &e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| unreachable(&url, &e))?;

        tracing::debug!(%method, %url, status = status.as_u16(), "backend responded");

        if !status.is_success() {
            return Err(ClientError::BadStatus {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok((url, text))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Option<Duration>,
    ) -> ClientResult<T> {
        let (url, text) = self.execute(Method::GET, path, None, timeout).await?;
        decode(&url, &text)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let body = self.encode(path, body)?;
        let (url, text) = self.execute(Method::POST, path, Some(body), None).await?;
        decode(&url, &text)
    }

    async fn post_ack<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> ClientResult<Ack> {
        let body = self.encode(path, body)?;
        let (_, text) = self.execute(Method::POST, path, Some(body), timeout).await?;
        Ok(decode_ack(&text))
    }

    fn encode<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<Value> {
        serde_json::to_value(body).map_err(|e| ClientError::Decode {
            url: self.url(path),
            reason: format!("request body: {}", e),
        })
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    /// `GET /nodes`
    pub async fn nodes(&self) -> ClientResult<Vec<Node>> {
        let (url, text) = self.execute(Method::GET, "/nodes", None, None).await?;
        let value: Value = decode(&url, &text)?;
        let Value::Array(items) = value else {
            return Err(ClientError::Decode {
                url,
                reason: "expected an array of nodes".to_string(),
            });
        };

        let received = items.len();
        let nodes: Vec<Node> = items.into_iter().filter_map(Node::from_value).collect();
        if nodes.len() != received {
            tracing::warn!(
                skipped = received - nodes.len(),
                "ignored node list entries that are not objects"
            );
        }
        Ok(nodes)
    }

    /// `POST /nodes`
    pub async fn create(&self, spec: &NodeSpec) -> ClientResult<Node> {
        let value: Value = self.post("/nodes", spec).await?;
        Node::from_value(value).ok_or_else(|| ClientError::Decode {
            url: self.url("/nodes"),
            reason: "created node is not an object".to_string(),
        })
    }

    /// `POST /trust/simulate-attack`
    pub async fn attack(&self, node_id: &str) -> ClientResult<Ack> {
        self.post_ack("/trust/simulate-attack", &NodeRef::new(node_id), None)
            .await
    }

    /// `POST /trust/calculate`
    pub async fn trust(&self, node_id: &str) -> ClientResult<TrustResult> {
        self.post("/trust/calculate", &NodeRef::new(node_id)).await
    }

    /// `POST /trust/monitor`
    pub async fn monitor(&self, node_id: &str) -> ClientResult<MonitorReport> {
        self.post("/trust/monitor", &NodeRef::new(node_id)).await
    }

    /// `GET /trust/anomalies/{nodeId}`
    pub async fn anomalies(&self, node_id: &str) -> ClientResult<AnomalyReport> {
        let path = format!("/trust/anomalies/{}", urlencoding::encode(node_id));
        self.get(&path, None).await
    }

    /// `POST /trust/block`
    pub async fn block(&self, node_id: &str, reason: &str) -> ClientResult<Ack> {
        self.post_ack("/trust/block", &NodeRef::with_reason(node_id, reason), None)
            .await
    }

    /// `POST /trust/unblock`
    pub async fn unblock(&self, node_id: &str) -> ClientResult<Ack> {
        self.post_ack("/trust/unblock", &NodeRef::new(node_id), None)
            .await
    }

    /// `GET /health`
    pub async fn health(&self) -> ClientResult<HealthView> {
        let mut health: HealthView = self.get("/health", Some(self.probe_timeout)).await?;
        health.ok = health.status_is_online();
        Ok(health)
    }

    /// `GET /config`
    pub async fn config(&self) -> ClientResult<ConfigView> {
        self.get("/config", Some(self.probe_timeout)).await
    }

    /// `POST /config/mode`
    pub async fn mode(&self, mode: SystemMode) -> ClientResult<Ack> {
        self.post_ack("/config/mode", &ModeRequest { mode }, Some(self.probe_timeout))
            .await
    }
}

#[async_trait]
impl PipelineBackend for BackendClient {
    async fn list_nodes(&self) -> ClientResult<Vec<Node>> {
        self.nodes().await
    }

    async fn create_node(&self, spec: &NodeSpec) -> ClientResult<Node> {
        self.create(spec).await
    }

    async fn simulate_attack(&self, node_id: &str) -> ClientResult<Ack> {
        self.attack(node_id).await
    }

    async fn calculate_trust(&self, node_id: &str) -> ClientResult<TrustResult> {
        self.trust(node_id).await
    }

    async fn monitor_behavior(&self, node_id: &str) -> ClientResult<MonitorReport> {
        self.monitor(node_id).await
    }

    async fn detect_anomalies(&self, node_id: &str) -> ClientResult<AnomalyReport> {
        self.anomalies(node_id).await
    }

    async fn block_node(&self, node_id: &str, reason: &str) -> ClientResult<Ack> {
        self.block(node_id, reason).await
    }

    async fn unblock_node(&self, node_id: &str) -> ClientResult<Ack> {
        self.unblock(node_id).await
    }

    async fn get_health(&self) -> ClientResult<HealthView> {
        self.health().await
    }

    async fn get_config(&self) -> ClientResult<ConfigView> {
        self.config().await
    }

    async fn set_mode(&self, mode: SystemMode) -> ClientResult<Ack> {
        self.mode(mode).await
    }
}

fn unreachable(url: &str, err: &reqwest::Error) -> ClientError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    };
    ClientError::NetworkUnreachable {
        url: url.to_string(),
        reason,
    }
}

fn decode<T: DeserializeOwned>(url: &str, text: &str) -> ClientResult<T> {
    serde_json::from_str(text).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Acks are informational, so any 2xx body is accepted
fn decode_ack(text: &str) -> Ack {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ack::default();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        Ok(Value::String(message)) => Ack {
            message: Some(message),
            node: None,
        },
        _ => Ack {
            message: Some(trimmed.to_string()),
            node: None,
        },
    }
}
