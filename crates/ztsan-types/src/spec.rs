//! Node creation payloads
//!
//! A node is created either from a full custom description (the creation
//! form) or from an `{ip, preset}` shorthand that the backend expands into a
//! canned configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named canned node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Healthy,
    Suspicious,
    Compromised,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Healthy, Preset::Suspicious, Preset::Compromised];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Suspicious => "suspicious",
            Self::Compromised => "compromised",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Suspicious => "Suspicious",
            Self::Compromised => "Compromised",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Healthy => Self::Suspicious,
            Self::Suspicious => Self::Compromised,
            Self::Compromised => Self::Healthy,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown preset '{0}', expected healthy, suspicious or compromised")]
pub struct ParsePresetError(pub String);

impl FromStr for Preset {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or(ParsePresetError(wanted))
    }
}

// ============================================================================
// Custom form records
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Laptop,
    Server,
    Mobile,
    #[default]
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Laptop => "laptop",
            Self::Server => "server",
            Self::Mobile => "mobile",
            Self::Unknown => "unknown",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Desktop => Self::Laptop,
            Self::Laptop => Self::Server,
            Self::Server => Self::Mobile,
            Self::Mobile => Self::Unknown,
            Self::Unknown => Self::Desktop,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::None => Self::Low,
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Critical,
            Self::Critical => Self::None,
        }
    }
}

/// Device identity as entered on the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub os_type: String,
    pub os_version: String,
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            os_type: "unknown".to_string(),
            os_version: "unknown".to_string(),
            device_type: DeviceType::Unknown,
            hostname: None,
            mac_address: None,
        }
    }
}

/// Device posture checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub antivirus_active: bool,
    pub antivirus_updated: bool,
    pub firewall_enabled: bool,
    pub os_patched: bool,
    pub disk_encrypted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub threat_level: ThreatLevel,
}

/// Behavioral counters; `data_transferred` is in MB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorMetrics {
    pub files_accessed: u64,
    pub data_transferred: u64,
    pub login_attempts: u32,
    pub failed_auth_attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub mfa_enabled: bool,
}

/// Full custom node description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomNodeSpec {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_metrics: Option<HealthMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_info: Option<NetworkInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior_metrics: Option<BehaviorMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_credentials: Option<AuthCredentials>,
}

/// `{ip, preset}` shorthand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetSpec {
    pub ip: String,
    pub preset: Preset,
}

/// Body of `POST /nodes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Preset(PresetSpec),
    Custom(CustomNodeSpec),
}

impl NodeSpec {
    pub fn preset(ip: impl Into<String>, preset: Preset) -> Self {
        Self::Preset(PresetSpec {
            ip: ip.into(),
            preset,
        })
    }

    pub fn ip(&self) -> &str {
        match self {
            Self::Preset(spec) => &spec.ip,
            Self::Custom(spec) => &spec.ip,
        }
    }
}

impl From<CustomNodeSpec> for NodeSpec {
    fn from(spec: CustomNodeSpec) -> Self {
        Self::Custom(spec)
    }
}

/// Body of every `{nodeId}` trust endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef<'a> {
    pub node_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

impl<'a> NodeRef<'a> {
    pub fn new(node_id: &'a str) -> Self {
        Self {
            node_id,
            reason: None,
        }
    }

    pub fn with_reason(node_id: &'a str, reason: &'a str) -> Self {
        Self {
            node_id,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preset_wire_format() {
        let body = serde_json::to_value(NodeSpec::preset("10.0.0.5", Preset::Healthy)).unwrap();
        assert_eq!(body, json!({"ip": "10.0.0.5", "preset": "healthy"}));
    }

    #[test]
    fn test_custom_wire_format_omits_empty_records() {
        let spec = NodeSpec::from(CustomNodeSpec {
            ip: "192.168.1.20".to_string(),
            health_metrics: Some(HealthMetrics {
                antivirus_active: true,
                firewall_enabled: true,
                ..Default::default()
            }),
            ..Default::default()
        });
        let body = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            body,
            json!({
                "ip": "192.168.1.20",
                "healthMetrics": {
                    "antivirusActive": true,
                    "antivirusUpdated": false,
                    "firewallEnabled": true,
                    "osPatched": false,
                    "diskEncrypted": false
                }
            })
        );
        assert_eq!(spec.ip(), "192.168.1.20");
    }

    #[test]
    fn test_device_info_wire_format() {
        let info = DeviceInfo {
            os_type: "Linux".to_string(),
            os_version: "Ubuntu 22.04".to_string(),
            device_type: DeviceType::Server,
            hostname: Some("server-7".to_string()),
            mac_address: None,
        };
        assert_eq!(
            serde_json::to_value(info).unwrap(),
            json!({"osType": "Linux", "osVersion": "Ubuntu 22.04", "deviceType": "server", "hostname": "server-7"})
        );
    }

    #[test]
    fn test_preset_parse_and_cycle() {
        assert_eq!("Compromised".parse::<Preset>(), Ok(Preset::Compromised));
        assert!("evil".parse::<Preset>().is_err());
        assert_eq!(Preset::Compromised.next(), Preset::Healthy);
    }

    #[test]
    fn test_node_ref_wire_format() {
        assert_eq!(serde_json::to_value(NodeRef::new("n1")).unwrap(), json!({"nodeId": "n1"}));
        assert_eq!(
            serde_json::to_value(NodeRef::with_reason("n1", "Manual block")).unwrap(),
            json!({"nodeId": "n1", "reason": "Manual block"})
        );
    }
}
