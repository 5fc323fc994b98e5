//! Command implementations.

pub mod init;
pub mod log;
pub mod mutate;
pub mod pull;
pub mod push;
pub mod session;
pub mod status;

use tether_core::{SyncScope, TetherWorkspace};

/// Opens the workspace in the current directory.
pub fn open_workspace() -> anyhow::Result<TetherWorkspace> {
    Ok(TetherWorkspace::open(".")?)
}

/// Parses an optional scope argument; absent means everything.
pub fn scope_from_arg(arg: Option<&str>) -> SyncScope {
    match arg {
        Some(s) => SyncScope::parse(s),
        None => SyncScope::All,
    }
}

/// Actor label recorded on events this process creates.
pub fn actor() -> String {
    std::env::var("USER").unwrap_or_else(|_| "cli".to_string())
}
