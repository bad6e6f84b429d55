//! System mode, configuration and health payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::lenient;

/// Controller operating mode
///
/// In `demo` mode the backend simulates enforcement; in `production` it
/// applies real firewall rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    Demo,
    Production,
}

impl SystemMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Production => "production",
        }
    }

    /// The mode a toggle switches to
    pub fn opposite(&self) -> Self {
        match self {
            Self::Demo => Self::Production,
            Self::Production => Self::Demo,
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}', expected \"demo\" or \"production\"")]
pub struct ParseModeError(pub String);

impl FromStr for SystemMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "production" => Ok(Self::Production),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Body of `POST /config/mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeRequest {
    pub mode: SystemMode,
}

/// Trust score thresholds the backend enforces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustThresholds {
    #[serde(default)]
    pub full_access: u8,
    #[serde(default)]
    pub limited_access: u8,
    #[serde(default)]
    pub restricted_access: u8,
    #[serde(default)]
    pub blocked: u8,
}

/// Enforcement switches reported by `GET /config`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityFlags {
    #[serde(default, rename = "enforceFirewall")]
    pub enforce_firewall: bool,
    #[serde(default, rename = "requireMFA")]
    pub require_mfa: bool,
    #[serde(default, rename = "requireEncryption")]
    pub require_encryption: bool,
}

/// Response of `GET /config`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub mode: SystemMode,
    #[serde(default)]
    pub trust_thresholds: Option<TrustThresholds>,
    #[serde(default)]
    pub security: Option<SecurityFlags>,
}

/// Response of `GET /health`
///
/// `ok` is derived by the client: a 2xx whose `status` is absent or
/// `"online"`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HealthView {
    #[serde(skip)]
    pub ok: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(default)]
    pub mode: Option<SystemMode>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, Value>,
}

impl HealthView {
    /// Whether the reported status string counts as healthy
    pub fn status_is_online(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "online")
    }
}
