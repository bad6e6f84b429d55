//! Node types as observed through the controller API

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::lenient;

/// Placeholder shown for any field the backend did not send
pub const MISSING: &str = "-";

// ============================================================================
// Stage & Status
// ============================================================================

/// Pipeline phase a node visibly occupies
///
/// Exactly one of these holds for a node the backend considers well-formed.
/// Any other stage string is kept verbatim on the [`Node`] and parses to
/// `None` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Verification,
    Scoring,
    ActiveSession,
    Blocked,
}

impl Stage {
    /// The four pipeline columns, left to right
    pub const PIPELINE: [Stage; 4] = [
        Stage::Verification,
        Stage::Scoring,
        Stage::ActiveSession,
        Stage::Blocked,
    ];

    /// Wire name, exactly as the backend spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verification => "Verification",
            Self::Scoring => "Scoring",
            Self::ActiveSession => "Active Session",
            Self::Blocked => "Blocked",
        }
    }

    /// Exact-match parse of a wire name
    pub fn parse(raw: &str) -> Option<Self> {
        Self::PIPELINE.into_iter().find(|s| s.as_str() == raw)
    }

    /// Column index in [`Stage::PIPELINE`]
    pub fn index(&self) -> usize {
        match self {
            Self::Verification => 0,
            Self::Scoring => 1,
            Self::ActiveSession => 2,
            Self::Blocked => 3,
        }
    }

    /// Whether a trust score is meaningful in this stage
    pub fn has_score(&self) -> bool {
        !matches!(self, Self::Verification)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse node classification used for aggregate counts
///
/// Sourced independently of [`Stage`]; `blocked` status does not imply the
/// Blocked stage or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Pending,
    Active,
    Blocked,
    Suspended,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "blocked" => Some(Self::Blocked),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Node
// ============================================================================

/// A node as returned by the backend
///
/// Every field is optional: a field the backend omitted, nulled or sent with
/// the wrong type reads as `None`. The structured sub-records are kept as raw
/// JSON and never interpreted by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ip: Option<String>,
    /// Raw stage string; see [`Node::stage`]
    #[serde(default, rename = "stage", deserialize_with = "lenient::string")]
    pub stage_raw: Option<String>,
    /// Raw status string; see [`Node::status`]
    #[serde(default, rename = "status", deserialize_with = "lenient::string")]
    pub status_raw: Option<String>,
    #[serde(default, deserialize_with = "lenient::score")]
    pub trust_score: Option<u8>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub access_level: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub device_info: Option<Value>,
    #[serde(default)]
    pub device_fingerprint: Option<Value>,
    #[serde(default)]
    pub health_metrics: Option<Value>,
    #[serde(default)]
    pub network_info: Option<Value>,
    #[serde(default)]
    pub behavior_metrics: Option<Value>,
    #[serde(default)]
    pub auth_credentials: Option<Value>,
    #[serde(default)]
    pub trust_breakdown: Option<Value>,
    #[serde(default)]
    pub logs: Option<Value>,
}

impl Node {
    /// Build a node from one element of a `GET /nodes` array
    ///
    /// Returns `None` only when the element is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Parsed pipeline stage, `None` for absent or unknown values
    pub fn stage(&self) -> Option<Stage> {
        self.stage_raw.as_deref().and_then(Stage::parse)
    }

    /// Parsed status, `None` for absent or unknown values
    pub fn status(&self) -> Option<Status> {
        self.status_raw.as_deref().and_then(Status::parse)
    }

    /// First eight characters of the id, for compact display
    pub fn short_id(&self) -> String {
        match self.id.as_deref() {
            Some(id) => id.chars().take(8).collect(),
            None => MISSING.to_string(),
        }
    }

    pub fn ip_or_missing(&self) -> &str {
        self.ip.as_deref().unwrap_or(MISSING)
    }

    /// Trust score, only when the stage makes it meaningful
    pub fn displayed_score(&self) -> Option<u8> {
        match self.stage() {
            Some(stage) if stage.has_score() => self.trust_score,
            _ => None,
        }
    }

    /// Number of audit log entries the backend attached
    pub fn log_count(&self) -> usize {
        match &self.logs {
            Some(Value::Array(entries)) => entries.len(),
            _ => 0,
        }
    }

    /// Message of the most recent audit log entry, if any
    pub fn last_log_message(&self) -> Option<&str> {
        match &self.logs {
            Some(Value::Array(entries)) => entries
                .last()
                .and_then(|entry| entry.get("message"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Read an optional embedded node, ignoring anything that is not an object
pub fn optional_node<'de, D>(deserializer: D) -> Result<Option<Node>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(Node::from_value))
}

// ============================================================================
// Trust endpoint payloads
// ============================================================================

/// Generic acknowledgement from a mutating endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ack {
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: Option<String>,
    /// Updated node, when the endpoint echoes it
    #[serde(default, deserialize_with = "optional_node")]
    pub node: Option<Node>,
}

/// Response of `POST /trust/calculate`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustResult {
    #[serde(deserialize_with = "required_node")]
    pub node: Node,
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: Option<String>,
    #[serde(default)]
    pub trust_breakdown: Option<Value>,
}

/// Response of `POST /trust/monitor`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorReport {
    #[serde(deserialize_with = "required_node")]
    pub node: Node,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub suspicious_activities: Vec<String>,
}

/// Response of `GET /trust/anomalies/{nodeId}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    #[serde(default, deserialize_with = "lenient::string")]
    pub node_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub anomalies: Vec<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub count: Option<u64>,
}

fn required_node<'de, D>(deserializer: D) -> Result<Node, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Node::from_value(value).ok_or_else(|| serde::de::Error::custom("node must be an object"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_parse_is_exact() {
        assert_eq!(Stage::parse("Active Session"), Some(Stage::ActiveSession));
        assert_eq!(Stage::parse("active session"), None);
        assert_eq!(Stage::parse("Quarantine"), None);
        for stage in Stage::PIPELINE {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
            assert_eq!(Stage::PIPELINE[stage.index()], stage);
        }
    }

    #[test]
    fn test_full_backend_node() {
        let node = Node::from_value(json!({
            "id": "2f1c9a7e-0b44-4bd2-9d1e-5a0e8f2c1b11",
            "ip": "192.168.1.10",
            "status": "active",
            "stage": "Active Session",
            "trustScore": 91,
            "accessLevel": "full",
            "deviceFingerprint": {"osType": "Linux"},
            "healthMetrics": {"healthScore": 95},
            "logs": [
                {"message": "Node created from IP 192.168.1.10"},
                {"message": "Trust recalculated"}
            ]
        }))
        .unwrap();

        assert_eq!(node.stage(), Some(Stage::ActiveSession));
        assert_eq!(node.status(), Some(Status::Active));
        assert_eq!(node.trust_score, Some(91));
        assert_eq!(node.short_id(), "2f1c9a7e");
        assert_eq!(node.log_count(), 2);
        assert_eq!(node.last_log_message(), Some("Trust recalculated"));
        assert!(node.device_fingerprint.is_some());
        assert!(node.device_info.is_none());
    }

    #[test]
    fn test_unknown_stage_is_preserved() {
        let node = Node::from_value(json!({"id": "n1", "stage": "Quarantine", "status": "weird"}))
            .unwrap();
        assert_eq!(node.stage(), None);
        assert_eq!(node.stage_raw.as_deref(), Some("Quarantine"));
        assert_eq!(node.status(), None);
        assert_eq!(node.status_raw.as_deref(), Some("weird"));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(Node::from_value(json!("node")).is_none());
        assert!(Node::from_value(json!(null)).is_none());
        assert!(Node::from_value(json!({})).is_some());
    }

    #[test]
    fn test_score_hidden_during_verification() {
        let node = Node::from_value(json!({"stage": "Verification", "trustScore": 50})).unwrap();
        assert_eq!(node.displayed_score(), None);
        let node = Node::from_value(json!({"stage": "Blocked", "trustScore": 20})).unwrap();
        assert_eq!(node.displayed_score(), Some(20));
    }

    #[test]
    fn test_ack_tolerates_bad_node() {
        let ack: Ack = serde_json::from_value(json!({
            "message": "Attack Simulated! Node Blocked.",
            "node": "oops"
        }))
        .unwrap();
        assert_eq!(ack.message.as_deref(), Some("Attack Simulated! Node Blocked."));
        assert!(ack.node.is_none());
    }

    #[test]
    fn test_trust_result_requires_node() {
        let err = serde_json::from_value::<TrustResult>(json!({"message": "x"}));
        assert!(err.is_err());
        let ok: TrustResult = serde_json::from_value(json!({
            "message": "Trust score calculated",
            "node": {"id": "n1", "trustScore": 88}
        }))
        .unwrap();
        assert_eq!(ok.node.trust_score, Some(88));
    }

    #[test]
    fn test_anomaly_report() {
        let report: AnomalyReport = serde_json::from_value(json!({
            "nodeId": "n1",
            "anomalies": ["Brute force attack detected"],
            "count": 1
        }))
        .unwrap();
        assert_eq!(report.node_id.as_deref(), Some("n1"));
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.count, Some(1));
    }
}
