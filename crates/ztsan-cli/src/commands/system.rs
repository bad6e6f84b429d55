//! System commands - mode and health

use colored::*;
use ztsan_client::PipelineBackend;
use ztsan_types::SystemMode;

use super::{report, Session};
use crate::display;

/// Set the mode, or toggle it when none is given
pub async fn mode(session: &Session, target: Option<SystemMode>) -> anyhow::Result<()> {
    let result = match target {
        Some(mode) => session.dispatcher.set_mode(mode).await,
        None => session.dispatcher.toggle_mode().await,
    };
    report(result)?;
    Ok(())
}

pub async fn health(session: &Session) -> anyhow::Result<()> {
    let health = session.client.get_health().await?;

    display::heading("Backend Health");
    display::field("Backend", session.client.base_url());
    let status = health.status.as_deref().unwrap_or("unknown");
    if health.ok {
        println!("  {}: {}", "Status".bright_white(), status.bright_green());
    } else {
        println!("  {}: {}", "Status".bright_white(), status.bright_red());
    }
    if let Some(mode) = health.mode {
        display::field("Mode", mode.as_str());
    }
    if let Some(timestamp) = health.timestamp.as_deref() {
        display::field("Checked", timestamp);
    }
    for (service, state) in &health.services {
        let state = state
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| state.to_string());
        display::field(service, &state);
    }

    if !health.ok {
        anyhow::bail!("backend reports status '{}'", status);
    }
    Ok(())
}
