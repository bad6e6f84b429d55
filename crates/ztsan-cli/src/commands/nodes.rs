//! Node commands - listing and per-node trust actions

use colored::*;
use ztsan_client::PipelineBackend;
use ztsan_pipeline::{CreateOptions, LinkState, Notice, PipelineView};
use ztsan_types::{CustomNodeSpec, NodeSpec, Preset};

use super::{report, Session};
use crate::display;

/// Poll once and print the four stage columns
pub async fn status(session: &Session) -> anyhow::Result<()> {
    let snapshot = session
        .poll
        .handle()
        .refresh()
        .await
        .ok_or_else(|| anyhow::anyhow!("poll loop stopped before the first poll"))?;

    if let LinkState::Offline { kind, detail } = &snapshot.link {
        display::notice(&Notice::error(format!("Backend {}: {}", kind, detail)));
        anyhow::bail!("backend unavailable at {}", session.client.base_url());
    }

    let view = PipelineView::from_snapshot(&snapshot);
    display::heading("Zero Trust SAN Pipeline");
    display::field("Backend", session.client.base_url());
    display::field(
        "Mode",
        snapshot.mode.map_or("unknown", |m| m.as_str()),
    );
    display::field(
        "Nodes",
        &format!(
            "{} total, {} active, {} blocked, {} other",
            view.counts.total, view.counts.active, view.counts.blocked, view.counts.other
        ),
    );

    for (stage, nodes) in view.columns() {
        println!();
        println!(
            "  {} {}",
            stage.as_str().bright_white().bold(),
            format!("({})", nodes.len()).bright_black()
        );
        if nodes.is_empty() {
            println!("    {}", "empty".bright_black());
        }
        for node in nodes {
            display::node_row(node);
        }
    }
    if view.unstaged > 0 {
        println!();
        display::notice(&Notice::warning(format!(
            "{} node(s) with an unknown stage not shown",
            view.unstaged
        )));
    }
    Ok(())
}

pub async fn create(
    session: &Session,
    ip: String,
    preset: Option<Preset>,
    calculate_trust: bool,
) -> anyhow::Result<()> {
    let spec = match preset {
        Some(preset) => NodeSpec::preset(ip, preset),
        None => CustomNodeSpec {
            ip,
            ..CustomNodeSpec::default()
        }
        .into(),
    };
    let node = report(
        session
            .dispatcher
            .create_node(spec, CreateOptions { calculate_trust })
            .await,
    )?;
    if let Some(id) = node.id.as_deref() {
        display::field("id", id);
    }
    Ok(())
}

pub async fn attack(session: &Session, node_id: &str) -> anyhow::Result<()> {
    report(session.dispatcher.simulate_attack(node_id).await)?;
    Ok(())
}

pub async fn trust(session: &Session, node_id: &str) -> anyhow::Result<()> {
    let result = report(session.dispatcher.calculate_trust(node_id).await)?;
    if let Some(level) = result.node.access_level.as_deref() {
        display::field("access", level);
    }
    Ok(())
}

pub async fn monitor(session: &Session, node_id: &str) -> anyhow::Result<()> {
    report(session.dispatcher.monitor_behavior(node_id).await)?;
    Ok(())
}

pub async fn block(session: &Session, node_id: &str, reason: Option<&str>) -> anyhow::Result<()> {
    report(session.dispatcher.block_node(node_id, reason).await)?;
    Ok(())
}

pub async fn unblock(session: &Session, node_id: &str) -> anyhow::Result<()> {
    report(session.dispatcher.unblock_node(node_id).await)?;
    Ok(())
}

/// Read-only, so it bypasses the dispatcher
pub async fn anomalies(session: &Session, node_id: &str) -> anyhow::Result<()> {
    let report = session.client.detect_anomalies(node_id).await?;
    display::heading(&format!("Anomalies for {}", node_id));
    if report.anomalies.is_empty() {
        display::notice(&Notice::success("No anomalies detected"));
    }
    for anomaly in &report.anomalies {
        display::notice(&Notice::warning(anomaly.as_str()));
    }
    Ok(())
}
