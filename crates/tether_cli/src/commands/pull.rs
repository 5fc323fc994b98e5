//! Pull remote state and events into the local caches.

use super::{open_workspace, scope_from_arg};
use anyhow::Result;
use console::style;

pub fn run(scope: Option<&str>) -> Result<()> {
    let ws = open_workspace()?;
    let remote = ws.remote_client();
    let scope = scope_from_arg(scope);

    let report = ws.pull(&remote, &scope)?;

    for id in &report.updated {
        println!("  {} {}", style("updated").green(), id);
    }
    for conflict in &report.conflicts {
        println!(
            "  {} {}.{}: local {} superseded by remote {}",
            style("conflict").yellow(),
            conflict.entity_id,
            conflict.field,
            conflict.cached,
            conflict.remote
        );
    }
    println!(
        "Pull complete: {} updated, {} up to date, {} new event(s)",
        report.updated.len(),
        report.unchanged,
        report.events_fetched
    );

    if !report.is_clean() {
        for (id, reason) in &report.failed {
            eprintln!("  {} {}: {}", style("failed").red(), id, reason);
        }
        anyhow::bail!("{} entity(ies) failed to pull", report.failed.len());
    }

    Ok(())
}
