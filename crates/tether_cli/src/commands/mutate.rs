//! Status-mutating commands (start, complete, pause).

use super::{actor, open_workspace};
use anyhow::Result;
use console::style;
use tether_core::{AutoPushOutcome, EntityId, EntityKind, EntityStatus};

/// Applies a status mutation to one entity, then auto-pushes it.
///
/// The kind from the invoked subcommand must agree with the id prefix, so
/// 'tether task complete EPIC-01' is rejected rather than silently
/// mutating an epic.
pub fn run(kind: EntityKind, id: &str, status: EntityStatus) -> Result<()> {
    let entity_id = EntityId::new(id);

    let prefix = entity_id
        .as_str()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if EntityKind::parse(&prefix) != Some(kind) {
        anyhow::bail!("'{}' is not a {} id", entity_id, kind.as_str());
    }

    let ws = open_workspace()?;
    let remote = ws.autopush_client();
    let outcome = ws.mutate_status(&remote, &entity_id, status, &actor())?;

    println!("{} -> {}", entity_id, status.as_str());
    match outcome {
        AutoPushOutcome::Applied => {
            println!("  {} synced to remote", style("ok").green());
        }
        AutoPushOutcome::Queued => {
            println!(
                "  {} remote unreachable; queued for next push",
                style("offline").yellow()
            );
        }
        AutoPushOutcome::Dropped => {
            eprintln!(
                "  {} could not sync or queue; re-run 'tether push' once the disk recovers",
                style("warning").red()
            );
        }
    }

    Ok(())
}
