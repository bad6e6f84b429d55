//! One-shot subcommands
//!
//! Each command runs against a short-lived [`Session`]: the same client,
//! poll loop and dispatcher the dashboard uses, torn down on exit.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use ztsan_client::BackendClient;
use ztsan_pipeline::{CommandDispatcher, DispatchError, Outcome, PollConfig, PollLoop};

use crate::display;

pub mod nodes;
pub mod system;

pub struct Session {
    pub client: Arc<BackendClient>,
    pub poll: PollLoop,
    pub dispatcher: CommandDispatcher,
}

impl Session {
    pub fn start(client: BackendClient, poll_config: PollConfig) -> Self {
        let client = Arc::new(client);
        let poll = PollLoop::spawn(client.clone(), poll_config, CancellationToken::new());
        let dispatcher = CommandDispatcher::new(client.clone(), poll.handle());
        Self {
            client,
            poll,
            dispatcher,
        }
    }

    pub async fn close(self) {
        self.poll.shutdown().await;
    }
}

/// Print an action's notices, or its failure notice and fail the command
fn report<T>(result: Result<Outcome<T>, DispatchError>) -> anyhow::Result<T> {
    match result {
        Ok(outcome) => {
            display::notices(&outcome.notices);
            Ok(outcome.value)
        }
        Err(err) => {
            display::notice(&err.notice());
            Err(err.into())
        }
    }
}
