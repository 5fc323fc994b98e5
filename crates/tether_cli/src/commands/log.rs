//! Append a free-form event to an entity's log.

use super::{actor, open_workspace};
use anyhow::Result;
use console::style;
use tether_core::{AutoPushOutcome, EntityId, EventCategory};

pub fn run(id: &str, text: &str, category: &str) -> Result<()> {
    let category = parse_category(category)?;
    let entity_id = EntityId::new(id);

    let ws = open_workspace()?;
    let remote = ws.autopush_client();
    let outcome = ws.log_event(&remote, &entity_id, category, text, &actor())?;

    match outcome {
        AutoPushOutcome::Applied => {
            println!("Logged event on {}", entity_id);
        }
        AutoPushOutcome::Queued => {
            println!(
                "Logged event on {} ({} queued for next push)",
                entity_id,
                style("offline").yellow()
            );
        }
        AutoPushOutcome::Dropped => {
            anyhow::bail!("could not record the event remotely or queue it");
        }
    }

    Ok(())
}

fn parse_category(s: &str) -> Result<EventCategory> {
    match s.to_lowercase().as_str() {
        "status" => Ok(EventCategory::Status),
        "progress" => Ok(EventCategory::Progress),
        "note" => Ok(EventCategory::Note),
        "handoff" => Ok(EventCategory::Handoff),
        "session" => Ok(EventCategory::Session),
        other => anyhow::bail!(
            "unknown event category '{}' (expected status, progress, note, handoff or session)",
            other
        ),
    }
}
