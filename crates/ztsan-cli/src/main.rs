//! Zero Trust SAN CLI - Node pipeline dashboard and one-shot commands
//!
//! With no subcommand the terminal dashboard starts. The other subcommands
//! run a single action against the controller and exit.
//!
//! # Quick Start
//!
//! ```bash
//! # Live dashboard against a local controller
//! ztsan --server http://localhost:3000/api
//!
//! # One-shot commands
//! ztsan status
//! ztsan create --ip 10.0.0.5 --preset healthy --score
//! ztsan attack 3f2a9c1e
//! ztsan mode production
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ztsan_client::{BackendClient, ClientConfig, DEFAULT_API_URL};
use ztsan_pipeline::PollConfig;
use ztsan_types::{Preset, SystemMode};

mod commands;
mod display;

use commands::{nodes, system, Session};

/// Zero Trust SAN dashboard
#[derive(Parser)]
#[command(name = "ztsan")]
#[command(author = "Zero Trust SAN Contributors")]
#[command(version)]
#[command(about = "Live node pipeline for the Zero Trust SAN controller", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Controller API base URL
    #[arg(long, global = true, env = "ZTSAN_API_URL", default_value = DEFAULT_API_URL)]
    server: String,

    /// Poll interval in milliseconds
    #[arg(long, global = true, env = "ZTSAN_REFRESH_MS", default_value_t = 2000)]
    refresh_ms: u64,

    /// Write logs to this file (the dashboard logs nowhere otherwise)
    #[arg(long, global = true, env = "ZTSAN_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the live pipeline dashboard (default)
    Dashboard,

    /// Poll once and print the pipeline
    Status,

    /// Create a node
    Create {
        /// Node IP address
        #[arg(long)]
        ip: String,

        /// Canned configuration: healthy, suspicious or compromised
        #[arg(long)]
        preset: Option<Preset>,

        /// Calculate the trust score right after creation
        #[arg(long)]
        score: bool,
    },

    /// Simulate an attack on a node
    Attack { node_id: String },

    /// Recalculate a node's trust score
    Trust { node_id: String },

    /// Run a behavior check on a node
    Monitor { node_id: String },

    /// List anomalies detected for a node
    Anomalies { node_id: String },

    /// Block a node
    Block {
        node_id: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Unblock a node
    Unblock { node_id: String },

    /// Set the system mode, or toggle it when omitted
    Mode { mode: Option<SystemMode> },

    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Dashboard);
    let interactive = matches!(command, Commands::Dashboard);
    init_tracing(cli.log_file.as_deref(), interactive)?;

    let client = BackendClient::new(ClientConfig::new(cli.server.as_str()))?;
    tracing::debug!(server = %client.base_url(), refresh_ms = cli.refresh_ms, "starting");

    let session = Session::start(
        client,
        PollConfig {
            interval: Duration::from_millis(cli.refresh_ms.max(100)),
        },
    );
    let result = run(&session, command).await;
    session.close().await;
    result
}

async fn run(session: &Session, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Dashboard => {
            ztsan_tui::run_dashboard(session.dispatcher.clone(), session.poll.handle()).await?;
        }
        Commands::Status => nodes::status(session).await?,
        Commands::Create { ip, preset, score } => nodes::create(session, ip, preset, score).await?,
        Commands::Attack { node_id } => nodes::attack(session, &node_id).await?,
        Commands::Trust { node_id } => nodes::trust(session, &node_id).await?,
        Commands::Monitor { node_id } => nodes::monitor(session, &node_id).await?,
        Commands::Anomalies { node_id } => nodes::anomalies(session, &node_id).await?,
        Commands::Block { node_id, reason } => {
            nodes::block(session, &node_id, reason.as_deref()).await?
        }
        Commands::Unblock { node_id } => nodes::unblock(session, &node_id).await?,
        Commands::Mode { mode } => system::mode(session, mode).await?,
        Commands::Health => system::health(session).await?,
    }
    Ok(())
}

/// Logs go to `log_file` when given; otherwise to stderr, except in the
/// dashboard where stderr would tear the terminal.
fn init_tracing(log_file: Option<&Path>, interactive: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if interactive => {}
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
