//! Timer-driven refresh of the node snapshot
//!
//! The poll loop is the only writer of the [`Snapshot`]. It runs as one
//! tokio task, so polls never overlap. Refreshes requested while a poll is in
//! flight are coalesced into a single follow-up poll that starts as soon as
//! the current one publishes, so the snapshot answering a request was always
//! fetched after it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use ztsan_client::{ClientResult, PipelineBackend};
use ztsan_types::{ConfigView, Node, SystemMode};

use crate::snapshot::{LinkState, Snapshot};

/// Default cadence of the heartbeat
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Poll loop configuration
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

type Waiter = oneshot::Sender<Arc<Snapshot>>;

/// Running poll loop; owns the background task
pub struct PollLoop {
    handle: PollHandle,
    task: JoinHandle<()>,
}

/// Cheap, cloneable access to a running poll loop
#[derive(Clone)]
pub struct PollHandle {
    requests: mpsc::UnboundedSender<Option<Waiter>>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    cancel: CancellationToken,
}

impl PollLoop {
    /// Start polling. The first poll runs immediately.
    ///
    /// Cancelling `cancel` (or calling [`PollLoop::shutdown`]) stops the
    /// loop and discards any in-flight result.
    pub fn spawn(
        backend: Arc<dyn PipelineBackend>,
        config: PollConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::initial()));
        let (request_tx, request_rx) = mpsc::unbounded_channel();

        let poller = Poller {
            backend,
            interval: config.interval,
            snapshots: snapshot_tx,
            requests: request_rx,
            cancel: cancel.clone(),
            version: 0,
            nodes: Arc::new(Vec::new()),
            mode: None,
        };
        let task = tokio::spawn(poller.run());

        Self {
            handle: PollHandle {
                requests: request_tx,
                snapshots: snapshot_rx,
                cancel,
            },
            task,
        }
    }

    pub fn handle(&self) -> PollHandle {
        self.handle.clone()
    }

    /// Stop the loop and wait for the task to exit
    pub async fn shutdown(self) {
        self.handle.cancel.cancel();
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "poll task ended abnormally");
        }
    }
}

impl PollHandle {
    /// Subscribe to every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    /// Latest published snapshot
    pub fn latest(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// Ask for an out-of-cadence poll without waiting for it
    ///
    /// Returns `false` once the loop has stopped.
    pub fn request_refresh(&self) -> bool {
        !self.cancel.is_cancelled() && self.requests.send(None).is_ok()
    }

    /// Ask for an out-of-cadence poll and wait for the snapshot that answers it
    ///
    /// Resolves to `None` if the loop stops before publishing.
    pub async fn refresh(&self) -> Option<Arc<Snapshot>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.requests.send(Some(tx)).ok()?;
        rx.await.ok()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

struct Poller {
    backend: Arc<dyn PipelineBackend>,
    interval: Duration,
    snapshots: watch::Sender<Arc<Snapshot>>,
    requests: mpsc::UnboundedReceiver<Option<Waiter>>,
    cancel: CancellationToken,
    version: u64,
    nodes: Arc<Vec<Node>>,
    mode: Option<SystemMode>,
}

impl Poller {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut waiters: Vec<Waiter> = Vec::new();
        let mut follow_up = false;

        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "poll loop started");

        loop {
            if !follow_up {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                    request = self.requests.recv() => match request {
                        Some(waiter) => waiters.extend(waiter),
                        None => break,
                    },
                }
            }
            while let Ok(waiter) = self.requests.try_recv() {
                waiters.extend(waiter);
            }

            let mut late = Vec::new();
            let Some(snapshot) = self.poll_once(&mut late, &mut follow_up).await else {
                break;
            };
            for waiter in waiters.drain(..) {
                let _ = waiter.send(snapshot.clone());
            }
            // Requests that arrived mid-flight may postdate the fetch; the
            // follow-up poll answers them.
            waiters = late;
            if follow_up {
                tracing::debug!(waiters = waiters.len(), "follow-up poll");
            }
            // A forced poll restarts the cadence so the next natural tick
            // never lands right behind it.
            ticker.reset();
        }

        tracing::debug!(version = self.version, "poll loop stopped");
    }

    /// Run one poll; requests arriving meanwhile go to `late` and set
    /// `follow_up`
    ///
    /// Returns `None` when cancelled before the poll completed.
    async fn poll_once(
        &mut self,
        late: &mut Vec<Waiter>,
        follow_up: &mut bool,
    ) -> Option<Arc<Snapshot>> {
        *follow_up = false;
        let backend = self.backend.clone();
        let fetch = async move { tokio::join!(backend.list_nodes(), backend.get_config()) };
        tokio::pin!(fetch);

        let (nodes, config) = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                result = &mut fetch => break result,
                Some(waiter) = self.requests.recv() => {
                    late.extend(waiter);
                    *follow_up = true;
                }
            }
        };

        if self.cancel.is_cancelled() {
            return None;
        }
        Some(self.publish(nodes, config))
    }

    fn publish(
        &mut self,
        nodes: ClientResult<Vec<Node>>,
        config: ClientResult<ConfigView>,
    ) -> Arc<Snapshot> {
        match config {
            Ok(config) => {
                if self.mode.is_some() && self.mode != Some(config.mode) {
                    tracing::info!(mode = %config.mode, "backend mode changed");
                }
                self.mode = Some(config.mode);
            }
            Err(err) => tracing::debug!(error = %err, "config refresh failed; keeping last mode"),
        }

        let link = match nodes {
            Ok(nodes) => {
                self.nodes = Arc::new(nodes);
                LinkState::Online
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = %err.kind(), "node poll failed");
                LinkState::from_error(&err)
            }
        };

        self.version += 1;
        let snapshot = Arc::new(Snapshot {
            version: self.version,
            fetched_at: Some(Utc::now()),
            nodes: self.nodes.clone(),
            mode: self.mode,
            link,
        });
        tracing::debug!(
            version = snapshot.version,
            nodes = snapshot.nodes.len(),
            online = snapshot.is_online(),
            "published snapshot"
        );

        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}
