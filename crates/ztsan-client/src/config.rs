//! Client configuration

use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Default controller API root
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root including the `/api` base path
    pub base_url: String,
    /// Timeout for every call that is not a probe
    pub request_timeout: Duration,
    /// Timeout for `/health` and `/config`
    pub probe_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Base URL without trailing slashes, checked to be an http(s) URL
    pub(crate) fn normalized_base(&self) -> ClientResult<String> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let parsed = reqwest::Url::parse(trimmed)
            .map_err(|e| ClientError::Config(format!("base url '{}': {}", self.base_url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(trimmed.to_string()),
            other => Err(ClientError::Config(format!(
                "base url '{}' uses unsupported scheme '{}'",
                self.base_url, other
            ))),
        }
    }
}
