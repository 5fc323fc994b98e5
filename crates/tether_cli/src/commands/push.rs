//! Push local content changes to the graph remote.

use super::{open_workspace, scope_from_arg};
use anyhow::Result;
use console::style;

pub fn run(scope: Option<&str>) -> Result<()> {
    let ws = open_workspace()?;
    let remote = ws.remote_client();
    let scope = scope_from_arg(scope);

    let report = ws.push(&remote, &scope)?;

    if report.drained > 0 {
        println!("Applied {} queued operation(s)", report.drained);
    }
    for id in &report.pushed {
        println!("  {} {}", style("pushed").green(), id);
    }
    println!(
        "Push complete: {} pushed, {} up to date",
        report.pushed.len(),
        report.skipped
    );

    if !report.is_clean() {
        for (id, reason) in &report.failed {
            eprintln!("  {} {}: {}", style("failed").red(), id, reason);
        }
        anyhow::bail!("{} entity(ies) failed to push", report.failed.len());
    }

    Ok(())
}
