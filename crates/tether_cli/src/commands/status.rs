//! Show sync status for tracked entities.

use super::open_workspace;
use anyhow::Result;
use chrono::{Local, TimeZone};
use console::style;
use tether_core::CursorStatus;

pub fn run() -> Result<()> {
    let ws = open_workspace()?;
    let summary = ws.status_summary()?;

    if summary.entities.is_empty() {
        println!("No entities tracked yet. Run 'tether push' after creating documents.");
    } else {
        println!(
            "{:<14} {:<8} {:<12} {:>8} {}",
            style("ENTITY").bold(),
            style("KIND").bold(),
            style("STATUS").bold(),
            style("VERSION").bold(),
            style("LAST SYNC").bold()
        );
        for line in &summary.entities {
            let version = line
                .last_pulled_version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            let status = line.status.as_deref().unwrap_or("-");
            println!(
                "{:<14} {:<8} {:<12} {:>8} {}",
                line.entity_id,
                line.entity_type.as_str(),
                status,
                version,
                format_timestamp(line.last_synced_at)
            );
        }
    }

    if summary.queue_depth > 0 {
        println!();
        println!(
            "{} {} operation(s) queued offline; run 'tether push' to apply",
            style("!").yellow(),
            summary.queue_depth
        );
    }

    if let Some(session) = &summary.session {
        if session.status == CursorStatus::Active {
            println!();
            println!(
                "Active session '{}' (last active {})",
                session.cursor_id,
                format_timestamp(session.last_active_at)
            );
        }
    }

    Ok(())
}

fn format_timestamp(unix: i64) -> String {
    match Local.timestamp_opt(unix, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => unix.to_string(),
    }
}
