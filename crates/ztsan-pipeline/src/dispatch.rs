//! User actions against the backend
//!
//! Every action is validated locally, sent once, and on success followed by
//! a refresh request to the poll loop. The dispatcher never edits the
//! snapshot itself: a created node shows up only once a poll returns it.
//!
//! Each action instance (kind plus target) moves through
//! `Idle -> Submitting -> Succeeded | Failed`. A second submission of an
//! instance that is still `Submitting` is rejected; different instances run
//! side by side.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use ztsan_client::{ClientError, ClientResult, PipelineBackend};
use ztsan_types::{Ack, MonitorReport, Node, NodeSpec, SystemMode, TrustResult};

use crate::notice::Notice;
use crate::poll::PollHandle;

/// Reason sent with a block request when the user gives none
pub const DEFAULT_BLOCK_REASON: &str = "Manually blocked from dashboard";

// ============================================================================
// Action identity and state
// ============================================================================

/// One action instance: kind plus target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    CreateNode(String),
    SimulateAttack(String),
    CalculateTrust(String),
    MonitorBehavior(String),
    Block(String),
    Unblock(String),
    SetMode,
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateNode(ip) => write!(f, "create node {}", ip),
            Self::SimulateAttack(id) => write!(f, "attack simulation on {}", id),
            Self::CalculateTrust(id) => write!(f, "trust calculation for {}", id),
            Self::MonitorBehavior(id) => write!(f, "behavior check for {}", id),
            Self::Block(id) => write!(f, "block {}", id),
            Self::Unblock(id) => write!(f, "unblock {}", id),
            Self::SetMode => f.write_str("mode change"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionState {
    Idle,
    Submitting,
    Succeeded,
    /// Carries the failure detail shown to the user
    Failed(String),
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Rejected before any network call
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0} is already in progress")]
    AlreadySubmitting(ActionKey),

    #[error("{action} failed: {source}")]
    Failed {
        action: ActionKey,
        #[source]
        source: ClientError,
    },

    /// Session torn down while the call was in flight; the result was discarded
    #[error("{0} cancelled")]
    Cancelled(ActionKey),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    /// How the failure is shown to the user
    ///
    /// Backend rejections surface the backend's text unchanged.
    pub fn notice(&self) -> Notice {
        match self {
            Self::Validation(reason) => Notice::warning(reason.clone()),
            Self::AlreadySubmitting(key) => Notice::info(format!("{} is already in progress", key)),
            Self::Failed { source, .. } => Notice::error(source.detail()),
            Self::Cancelled(key) => Notice::info(format!("{} cancelled", key)),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Successful action result plus the notices describing it
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub notices: Vec<Notice>,
}

impl<T> Outcome<T> {
    fn new(value: T, notice: Notice) -> Self {
        Self {
            value,
            notices: vec![notice],
        }
    }

    fn with(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Chain `calculate_trust` on the new node
    pub calculate_trust: bool,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Sends user actions and keeps per-instance submission state
#[derive(Clone)]
pub struct CommandDispatcher {
    backend: Arc<dyn PipelineBackend>,
    poll: PollHandle,
    states: Arc<DashMap<ActionKey, ActionState>>,
    cancel: CancellationToken,
}

impl CommandDispatcher {
    /// Dispatcher tied to the poll loop's session; shutting the loop down
    /// also cancels in-flight actions.
    pub fn new(backend: Arc<dyn PipelineBackend>, poll: PollHandle) -> Self {
        let cancel = poll.cancellation();
        Self {
            backend,
            poll,
            states: Arc::new(DashMap::new()),
            cancel,
        }
    }

    pub fn state(&self, key: &ActionKey) -> ActionState {
        self.states
            .get(key)
            .map(|state| state.value().clone())
            .unwrap_or(ActionState::Idle)
    }

    pub fn is_submitting(&self, key: &ActionKey) -> bool {
        self.state(key) == ActionState::Submitting
    }

    /// `POST /nodes`, optionally followed by a trust calculation
    ///
    /// A failed trust calculation is reported as a warning; the node was
    /// still created.
    pub async fn create_node(
        &self,
        spec: NodeSpec,
        options: CreateOptions,
    ) -> DispatchResult<Outcome<Node>> {
        let ip = validate_ip(spec.ip())?;
        let key = ActionKey::CreateNode(ip.clone());

        let backend = self.backend.clone();
        let (node, trust) = self
            .run(key, async move {
                let node = backend.create_node(&spec).await?;
                let trust = match (options.calculate_trust, node.id.as_deref()) {
                    (true, Some(id)) => Some(backend.calculate_trust(id).await),
                    _ => None,
                };
                Ok((node, trust))
            })
            .await?;

        tracing::info!(%ip, id = node.id.as_deref().unwrap_or("-"), "node created");
        let mut outcome = Outcome::new(node, Notice::success(format!("Node {} created", ip)));
        match trust {
            Some(Ok(result)) => {
                let score = result
                    .node
                    .trust_score
                    .map_or_else(|| "unknown".to_string(), |s| s.to_string());
                outcome = outcome.with(Notice::info(format!("Trust score for {}: {}", ip, score)));
            }
            Some(Err(err)) => {
                tracing::warn!(%ip, error = %err, "chained trust calculation failed");
                outcome = outcome.with(Notice::warning(format!(
                    "Node created but trust calculation failed: {}",
                    err.detail()
                )));
            }
            None => {}
        }

        self.poll.request_refresh();
        Ok(outcome)
    }

    /// `POST /trust/simulate-attack`
    pub async fn simulate_attack(&self, node_id: &str) -> DispatchResult<Outcome<Ack>> {
        let node_id = validate_node_id(node_id)?;
        let backend = self.backend.clone();
        let id = node_id.clone();
        let ack = self
            .run(ActionKey::SimulateAttack(node_id.clone()), async move {
                backend.simulate_attack(&id).await
            })
            .await?;

        let message = ack
            .message
            .clone()
            .unwrap_or_else(|| format!("Attack simulated on {}", node_id));
        self.poll.request_refresh();
        Ok(Outcome::new(ack, Notice::success(message)))
    }

    /// `POST /trust/calculate` for an existing node
    pub async fn calculate_trust(&self, node_id: &str) -> DispatchResult<Outcome<TrustResult>> {
        let node_id = validate_node_id(node_id)?;
        let backend = self.backend.clone();
        let id = node_id.clone();
        let result = self
            .run(ActionKey::CalculateTrust(node_id.clone()), async move {
                backend.calculate_trust(&id).await
            })
            .await?;

        let message = match result.node.trust_score {
            Some(score) => format!("Trust score for {}: {}", node_id, score),
            None => result
                .message
                .clone()
                .unwrap_or_else(|| format!("Trust calculated for {}", node_id)),
        };
        self.poll.request_refresh();
        Ok(Outcome::new(result, Notice::success(message)))
    }

    /// `POST /trust/monitor`
    pub async fn monitor_behavior(&self, node_id: &str) -> DispatchResult<Outcome<MonitorReport>> {
        let node_id = validate_node_id(node_id)?;
        let backend = self.backend.clone();
        let id = node_id.clone();
        let report = self
            .run(ActionKey::MonitorBehavior(node_id.clone()), async move {
                backend.monitor_behavior(&id).await
            })
            .await?;

        let notice = if report.suspicious_activities.is_empty() {
            Notice::success(format!("No suspicious activity on {}", node_id))
        } else {
            Notice::warning(format!(
                "Suspicious activity on {}: {}",
                node_id,
                report.suspicious_activities.join(", ")
            ))
        };
        self.poll.request_refresh();
        Ok(Outcome::new(report, notice))
    }

    /// `POST /trust/block`
    pub async fn block_node(&self, node_id: &str, reason: Option<&str>) -> DispatchResult<Outcome<Ack>> {
        let node_id = validate_node_id(node_id)?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_BLOCK_REASON)
            .to_string();
        let backend = self.backend.clone();
        let id = node_id.clone();
        let ack = self
            .run(ActionKey::Block(node_id.clone()), async move {
                backend.block_node(&id, &reason).await
            })
            .await?;

        let message = ack.message.clone().unwrap_or_else(|| format!("Node {} blocked", node_id));
        self.poll.request_refresh();
        Ok(Outcome::new(ack, Notice::success(message)))
    }

    /// `POST /trust/unblock`
    pub async fn unblock_node(&self, node_id: &str) -> DispatchResult<Outcome<Ack>> {
        let node_id = validate_node_id(node_id)?;
        let backend = self.backend.clone();
        let id = node_id.clone();
        let ack = self
            .run(ActionKey::Unblock(node_id.clone()), async move {
                backend.unblock_node(&id).await
            })
            .await?;

        let message = ack.message.clone().unwrap_or_else(|| format!("Node {} unblocked", node_id));
        self.poll.request_refresh();
        Ok(Outcome::new(ack, Notice::success(message)))
    }

    /// Read the current mode and switch to the other one
    pub async fn toggle_mode(&self) -> DispatchResult<Outcome<SystemMode>> {
        let backend = self.backend.clone();
        let mode = self
            .run(ActionKey::SetMode, async move {
                let current = backend.get_config().await?.mode;
                let target = current.opposite();
                backend.set_mode(target).await?;
                Ok(target)
            })
            .await?;
        Ok(self.mode_changed(mode).await)
    }

    /// `POST /config/mode` with an explicit target
    pub async fn set_mode(&self, mode: SystemMode) -> DispatchResult<Outcome<SystemMode>> {
        let backend = self.backend.clone();
        self.run(ActionKey::SetMode, async move { backend.set_mode(mode).await })
            .await?;
        Ok(self.mode_changed(mode).await)
    }

    async fn mode_changed(&self, mode: SystemMode) -> Outcome<SystemMode> {
        tracing::info!(%mode, "system mode changed");
        // The answering poll always starts after this request.
        if self.poll.refresh().await.is_none() {
            tracing::debug!("poll loop stopped before the mode refresh");
        }
        Outcome::new(mode, Notice::success(format!("System mode changed to {}", mode)))
    }

    /// Run one action instance through its state machine
    async fn run<T, F>(&self, key: ActionKey, call: F) -> DispatchResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::Cancelled(key));
        }
        let mut submission = Submission::begin(&self.states, key)?;
        tracing::debug!(action = %submission.key, "submitting");

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = call => Some(result),
        };
        // Results that land after teardown are discarded.
        let result = match result {
            Some(result) if !self.cancel.is_cancelled() => result,
            _ => {
                tracing::debug!(action = %submission.key, "discarded after teardown");
                return Err(DispatchError::Cancelled(submission.finish(ActionState::Idle)));
            }
        };

        match result {
            Ok(value) => {
                submission.finish(ActionState::Succeeded);
                Ok(value)
            }
            Err(source) => {
                tracing::warn!(action = %submission.key, error = %source, "action failed");
                let action = submission.finish(ActionState::Failed(source.detail()));
                Err(DispatchError::Failed { action, source })
            }
        }
    }
}

/// Holds an instance in `Submitting`; resets it to `Idle` if dropped unsettled
struct Submission {
    states: Arc<DashMap<ActionKey, ActionState>>,
    key: ActionKey,
    settled: bool,
}

impl Submission {
    fn begin(states: &Arc<DashMap<ActionKey, ActionState>>, key: ActionKey) -> DispatchResult<Self> {
        match states.entry(key.clone()) {
            Entry::Occupied(entry) if *entry.get() == ActionState::Submitting => {
                return Err(DispatchError::AlreadySubmitting(key));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(ActionState::Submitting);
            }
            Entry::Vacant(entry) => {
                entry.insert(ActionState::Submitting);
            }
        }
        Ok(Self {
            states: states.clone(),
            key,
            settled: false,
        })
    }

    fn finish(&mut self, state: ActionState) -> ActionKey {
        self.states.insert(self.key.clone(), state);
        self.settled = true;
        self.key.clone()
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        if !self.settled {
            self.states.insert(self.key.clone(), ActionState::Idle);
        }
    }
}

fn validate_ip(raw: &str) -> DispatchResult<String> {
    let ip = raw.trim();
    if ip.is_empty() {
        return Err(DispatchError::Validation("IP address is required".to_string()));
    }
    ip.parse::<IpAddr>()
        .map_err(|_| DispatchError::Validation(format!("'{}' is not a valid IP address", ip)))?;
    Ok(ip.to_string())
}

fn validate_node_id(raw: &str) -> DispatchResult<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(DispatchError::Validation("node id is required".to_string()));
    }
    Ok(id.to_string())
}
