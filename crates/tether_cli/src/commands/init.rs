//! Initialize a new tether workspace.

use anyhow::{Context, Result};
use tether_core::{Config, TetherWorkspace};

/// Initialize a tether workspace in the current directory.
pub fn run(project: &str, url: Option<&str>) -> Result<()> {
    let mut config = Config::default();
    config.remote.project_id = project.to_string();
    if let Some(url) = url {
        config.remote.base_url = url.trim_end_matches('/').to_string();
    }
    let token_env = config.remote.token_env.clone();

    TetherWorkspace::init(".", config).context("Failed to initialize tether workspace")?;

    println!("Initialized tether workspace in .tether/");
    println!();
    println!("Directory structure:");
    println!("  epics/ sprints/ tasks/    - Work item documents");
    println!("  adr/ patterns/ gotchas/   - Knowledge documents");
    println!("  charter.md                - Project charter");
    println!("  .tether/                  - Sync state (mostly gitignored)");
    println!();
    println!("Configuration written to .tether/config.toml");
    println!("Set {} to authenticate against the remote.", token_env);

    Ok(())
}
