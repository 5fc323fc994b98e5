//! Tether CLI - sync a markdown planning workspace with its graph remote.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tether_core::{EntityKind, EntityStatus};

mod commands;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Sync markdown planning documents with the graph remote", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a tether workspace in the current directory
    Init {
        /// Project identifier on the remote
        #[arg(long, default_value = "default")]
        project: String,
        /// Base URL of the graph service API
        #[arg(long)]
        url: Option<String>,
    },
    /// Push local content changes to the graph
    Push {
        /// Restrict to a kind ("tasks") or a single id ("TASK-01")
        scope: Option<String>,
    },
    /// Pull remote state and events into the local caches
    Pull {
        /// Restrict to a kind ("tasks") or a single id ("TASK-01")
        scope: Option<String>,
    },
    /// Show sync status for tracked entities
    Status,
    /// Task lifecycle commands
    Task {
        #[command(subcommand)]
        command: LifecycleCommands,
    },
    /// Sprint lifecycle commands
    Sprint {
        #[command(subcommand)]
        command: LifecycleCommands,
    },
    /// Epic lifecycle commands
    Epic {
        #[command(subcommand)]
        command: LifecycleCommands,
    },
    /// Append an event to an entity's log
    Log {
        /// Entity id (e.g. TASK-01)
        id: String,
        /// Event text
        text: String,
        /// Event category (status, progress, note, handoff, session)
        #[arg(long, default_value = "note")]
        category: String,
    },
    /// Session cursor management
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
enum LifecycleCommands {
    /// Mark the entity in progress
    Start {
        /// Entity id
        id: String,
    },
    /// Mark the entity complete
    Complete {
        /// Entity id
        id: String,
    },
    /// Pause work on the entity
    Pause {
        /// Entity id
        id: String,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Start a session cursor at the current end of the event stream
    Start {
        /// Cursor name (defaults to a generated id)
        #[arg(long)]
        name: Option<String>,
    },
    /// Replay events missed since the session was last active
    Resume,
    /// Show the session cursor position
    Status,
    /// End the active session cursor
    End,
}

fn lifecycle(kind: EntityKind, command: LifecycleCommands) -> Result<()> {
    match command {
        LifecycleCommands::Start { id } => commands::mutate::run(kind, &id, EntityStatus::InProgress),
        LifecycleCommands::Complete { id } => commands::mutate::run(kind, &id, EntityStatus::Complete),
        LifecycleCommands::Pause { id } => commands::mutate::run(kind, &id, EntityStatus::Paused),
    }
}

fn main() -> Result<()> {
    // Respects RUST_LOG (e.g. RUST_LOG=debug); diagnostics go to stderr so
    // stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { project, url } => commands::init::run(&project, url.as_deref()),
        Commands::Push { scope } => commands::push::run(scope.as_deref()),
        Commands::Pull { scope } => commands::pull::run(scope.as_deref()),
        Commands::Status => commands::status::run(),
        Commands::Task { command } => lifecycle(EntityKind::Task, command),
        Commands::Sprint { command } => lifecycle(EntityKind::Sprint, command),
        Commands::Epic { command } => lifecycle(EntityKind::Epic, command),
        Commands::Log { id, text, category } => commands::log::run(&id, &text, &category),
        Commands::Session { command } => match command {
            SessionCommands::Start { name } => commands::session::start(name.as_deref()),
            SessionCommands::Resume => commands::session::resume(),
            SessionCommands::Status => commands::session::status(),
            SessionCommands::End => commands::session::end(),
        },
    }
}
