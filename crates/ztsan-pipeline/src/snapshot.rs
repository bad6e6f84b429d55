//! Versioned node snapshot published by the poll loop

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ztsan_client::{ClientError, FailureKind};
use ztsan_types::{Node, SystemMode};

/// Connection state of the latest poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// No poll has completed yet
    Connecting,
    Online,
    /// Last poll failed; shown as a persistent banner until a poll succeeds
    Offline { kind: FailureKind, detail: String },
}

impl LinkState {
    pub fn from_error(err: &ClientError) -> Self {
        Self::Offline {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// One published view of the backend
///
/// Only the poll loop constructs snapshots. When a poll fails, the node list
/// of the last successful poll is carried over and the snapshot is stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Incremented by one on every publish; 0 is the initial snapshot
    pub version: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    pub nodes: Arc<Vec<Node>>,
    /// Last mode reported by `GET /config`
    pub mode: Option<SystemMode>,
    pub link: LinkState,
}

impl Snapshot {
    pub fn initial() -> Self {
        Self {
            version: 0,
            fetched_at: None,
            nodes: Arc::new(Vec::new()),
            mode: None,
            link: LinkState::Connecting,
        }
    }

    pub fn is_online(&self) -> bool {
        self.link == LinkState::Online
    }

    /// Node list did not come from the latest poll
    pub fn is_stale(&self) -> bool {
        matches!(self.link, LinkState::Offline { .. })
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::initial()
    }
}
