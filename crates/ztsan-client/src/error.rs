//! Client failure taxonomy

use std::fmt;
use thiserror::Error;

/// Everything a backend call can fail with
///
/// `NetworkUnreachable` and `BadStatus` are kept apart so callers can show
/// "offline" and "request rejected" differently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Connection refused, DNS failure, timeout or a dropped body
    #[error("backend unreachable at {url}: {reason}")]
    NetworkUnreachable { url: String, reason: String },

    /// Backend answered with a non-2xx status; `body` is the response text verbatim
    #[error("backend rejected request ({status}): {body}")]
    BadStatus { status: u16, body: String },

    /// 2xx whose body does not match the contract
    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Result type for backend calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Discriminant of [`ClientError`], cheap to copy into snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NetworkUnreachable,
    BadStatus,
    Decode,
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NetworkUnreachable => "offline",
            Self::BadStatus => "request rejected",
            Self::Decode => "bad response",
            Self::Config => "misconfigured",
        })
    }
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NetworkUnreachable { .. } => FailureKind::NetworkUnreachable,
            Self::BadStatus { .. } => FailureKind::BadStatus,
            Self::Decode { .. } => FailureKind::Decode,
            Self::Config(_) => FailureKind::Config,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.kind() == FailureKind::NetworkUnreachable
    }

    /// The text a user should see for this failure
    ///
    /// For `BadStatus` this is the backend's response body unchanged, falling
    /// back to the status code only when the body is empty.
    pub fn detail(&self) -> String {
        match self {
            Self::BadStatus { status, body } if body.trim().is_empty() => {
                format!("HTTP {}", status)
            }
            Self::BadStatus { body, .. } => body.clone(),
            Self::NetworkUnreachable { .. } => "backend offline".to_string(),
            Self::Decode { reason, .. } => reason.clone(),
            Self::Config(reason) => reason.clone(),
        }
    }
}
