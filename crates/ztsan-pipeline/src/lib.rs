//! Zero Trust SAN Pipeline - Live node pipeline for the dashboard
//!
//! This crate turns the controller REST API into something a render surface
//! can draw without ever seeing a half-updated state:
//!
//! - [`PollLoop`]: one background task that polls `GET /nodes` on a fixed
//!   cadence and publishes versioned [`Snapshot`]s over a `watch` channel
//! - [`PipelineView`]: pure partition of a snapshot into the four stage
//!   columns plus status aggregates
//! - [`CommandDispatcher`]: validated user actions with per-instance
//!   submission state; success requests a refresh, never a local edit
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use ztsan_client::{BackendClient, ClientConfig};
//! use ztsan_pipeline::{CommandDispatcher, PipelineView, PollConfig, PollLoop};
//!
//! let backend = Arc::new(BackendClient::new(ClientConfig::default())?);
//! let poll = PollLoop::spawn(backend.clone(), PollConfig::default(), CancellationToken::new());
//! let dispatcher = CommandDispatcher::new(backend, poll.handle());
//!
//! let mut snapshots = poll.handle().subscribe();
//! while snapshots.changed().await.is_ok() {
//!     let view = PipelineView::from_snapshot(&snapshots.borrow());
//!     println!("{} nodes, {} active", view.counts.total, view.counts.active);
//! }
//! ```

pub mod dispatch;
pub mod notice;
pub mod poll;
pub mod snapshot;
pub mod view;

#[cfg(test)]
mod test_support;

pub use dispatch::{
    ActionKey, ActionState, CommandDispatcher, CreateOptions, DispatchError, DispatchResult,
    Outcome, DEFAULT_BLOCK_REASON,
};
pub use notice::{Notice, NoticeLevel};
pub use poll::{PollConfig, PollHandle, PollLoop, DEFAULT_POLL_INTERVAL};
pub use snapshot::{LinkState, Snapshot};
pub use view::{PipelineView, StatusCounts};
