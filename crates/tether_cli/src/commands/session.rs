//! Session cursor management commands.

use super::open_workspace;
use anyhow::Result;
use chrono::{Local, TimeZone};
use console::style;

pub fn start(name: Option<&str>) -> Result<()> {
    let ws = open_workspace()?;
    let store = ws.session_store();
    let cursor = store.start(name, &ws.event_cache(), ws.now())?;

    println!("Started session '{}'", cursor.cursor_id);
    match &cursor.current_event_id {
        Some(id) => println!("  Positioned after event {}", id),
        None => println!("  Positioned at the start of the event stream"),
    }
    Ok(())
}

/// Replays cached events the session has not seen and moves its read head
/// past them. Run 'tether pull' first to refresh the cache.
pub fn resume() -> Result<()> {
    let ws = open_workspace()?;
    let store = ws.session_store();
    let events = store.resume(&ws.event_cache(), ws.now())?;

    if events.is_empty() {
        println!("Session is caught up; no new events.");
        return Ok(());
    }

    println!("{} event(s) since last activity:", events.len());
    for event in &events {
        let when = Local
            .timestamp_opt(event.timestamp, 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| event.timestamp.to_string());
        println!(
            "  {} {} {} [{}] {}",
            style(&when).dim(),
            event.entity_id,
            style(format!("{:?}", event.category).to_lowercase()).cyan(),
            event.actor,
            event.description
        );
    }
    Ok(())
}

pub fn status() -> Result<()> {
    let ws = open_workspace()?;
    match ws.session_store().get()? {
        Some(cursor) => {
            println!("Session '{}' ({:?})", cursor.cursor_id, cursor.status);
            match &cursor.current_event_id {
                Some(id) => println!("  Read head after event {}", id),
                None => println!("  Read head at the start of the event stream"),
            }
            let pending = ws
                .event_cache()
                .read_since(cursor.current_event_id.as_deref())?;
            if !pending.is_empty() {
                println!("  {} cached event(s) waiting; run 'tether session resume'", pending.len());
            }
        }
        None => println!("No session cursor. Start one with 'tether session start'."),
    }
    Ok(())
}

pub fn end() -> Result<()> {
    let ws = open_workspace()?;
    let cursor = ws.session_store().end(ws.now())?;
    println!("Ended session '{}'", cursor.cursor_id);
    Ok(())
}
