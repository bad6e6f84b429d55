//! Zero Trust SAN Client - Typed access to the controller REST API
//!
//! [`BackendClient`] wraps every endpoint the dashboard consumes and maps
//! transport and status failures into [`ClientError`]. The rest of the
//! dashboard talks to the backend only through the [`PipelineBackend`]
//! trait, so the poll loop and the command dispatcher can run against an
//! in-memory backend in tests.
//!
//! # Quick Start
//!
//! ```ignore
//! use ztsan_client::{BackendClient, ClientConfig, PipelineBackend};
//!
//! let client = BackendClient::new(ClientConfig::new("http://localhost:3000/api"))?;
//! for node in client.list_nodes().await? {
//!     println!("{} {:?}", node.ip_or_missing(), node.stage());
//! }
//! ```

use async_trait::async_trait;
use ztsan_types::{
    Ack, AnomalyReport, ConfigView, HealthView, MonitorReport, Node, NodeSpec, SystemMode,
    TrustResult,
};

pub mod client;
pub mod config;
pub mod error;

pub use client::BackendClient;
pub use config::{ClientConfig, DEFAULT_API_URL};
pub use error::{ClientError, ClientResult, FailureKind};

/// The controller contract as the dashboard consumes it
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    /// `GET /nodes`
    async fn list_nodes(&self) -> ClientResult<Vec<Node>>;

    /// `POST /nodes` with a custom or preset payload
    async fn create_node(&self, spec: &NodeSpec) -> ClientResult<Node>;

    /// `POST /trust/simulate-attack`
    async fn simulate_attack(&self, node_id: &str) -> ClientResult<Ack>;

    /// `POST /trust/calculate`
    async fn calculate_trust(&self, node_id: &str) -> ClientResult<TrustResult>;

    /// `POST /trust/monitor`
    async fn monitor_behavior(&self, node_id: &str) -> ClientResult<MonitorReport>;

    /// `GET /trust/anomalies/{nodeId}`
    async fn detect_anomalies(&self, node_id: &str) -> ClientResult<AnomalyReport>;

    /// `POST /trust/block`
    async fn block_node(&self, node_id: &str, reason: &str) -> ClientResult<Ack>;

    /// `POST /trust/unblock`
    async fn unblock_node(&self, node_id: &str) -> ClientResult<Ack>;

    /// `GET /health`
    async fn get_health(&self) -> ClientResult<HealthView>;

    /// `GET /config`
    async fn get_config(&self) -> ClientResult<ConfigView>;

    /// `POST /config/mode`
    async fn set_mode(&self, mode: SystemMode) -> ClientResult<Ack>;
}
