//! Display utilities for the CLI

use colored::*;
use ztsan_pipeline::{Notice, NoticeLevel};
use ztsan_types::{Node, Stage};

/// Title line for a report, underlined to its own width
pub fn heading(title: &str) {
    println!();
    println!("{}", title.bright_white().bold());
    println!("{}", "─".repeat(title.chars().count()).bright_black());
}

/// Aligned `label  value` line under a heading
pub fn field(label: &str, value: &str) {
    println!("  {} {}", format!("{:<9}", label).bright_black(), value.bright_cyan());
}

fn marker(level: NoticeLevel) -> ColoredString {
    match level {
        NoticeLevel::Info => "·".bright_blue(),
        NoticeLevel::Success => "✓".bright_green(),
        NoticeLevel::Warning => "!".yellow().bold(),
        NoticeLevel::Error => "✗".bright_red().bold(),
    }
}

/// Print a notice the way the dashboard's notice area shows it
pub fn notice(notice: &Notice) {
    let message = match notice.level {
        NoticeLevel::Error => notice.message.bright_red(),
        NoticeLevel::Warning => notice.message.yellow(),
        NoticeLevel::Info | NoticeLevel::Success => notice.message.normal(),
    };
    println!("{} {}", marker(notice.level), message);
}

pub fn notices(batch: &[Notice]) {
    batch.iter().for_each(notice);
}

/// One node row inside a stage listing
pub fn node_row(node: &Node) {
    let score = node
        .displayed_score()
        .map_or_else(|| "-".to_string(), |s| s.to_string());
    let stage_color = match node.stage() {
        Some(Stage::Verification) => "●".yellow(),
        Some(Stage::Scoring) => "●".bright_blue(),
        Some(Stage::ActiveSession) => "●".bright_green(),
        Some(Stage::Blocked) => "●".bright_red(),
        None => "○".bright_black(),
    };
    println!(
        "  {} {:10} {} trust {:>3}  {}",
        stage_color,
        node.short_id(),
        format!("{:16}", node.ip_or_missing()).bright_white(),
        score,
        node.status_raw.as_deref().unwrap_or("-").bright_black()
    );
}
