//! Error types for tether_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tether_core operations.
#[derive(Error, Debug)]
pub enum TetherError {
    /// Transient network failure talking to the remote graph service.
    ///
    /// Retried by the client per its backoff policy; surfaced only after
    /// all attempts are exhausted.
    #[error("remote unreachable: {0}")]
    Transient(String),

    /// The remote rejected our credentials. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote rejected a payload for one entity. Does not abort the batch.
    #[error("remote rejected {entity_id}: {message}")]
    Validation {
        /// Entity whose payload was rejected.
        entity_id: String,
        /// Reason reported by the remote.
        message: String,
    },

    /// I/O error on local state (sync-state store, offline queue, caches).
    ///
    /// Fatal to the current invocation: state consistency cannot be
    /// guaranteed once local writes start failing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sync-state file exists but cannot be parsed.
    #[error("sync state corrupted at {}: {}", path.display(), reason)]
    StateCorrupted {
        /// Path to the corrupted file.
        path: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// The offline queue file exists but cannot be parsed.
    #[error("offline queue corrupted at {}: {}", path.display(), reason)]
    QueueCorrupted {
        /// Path to the corrupted file.
        path: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// A file under a content directory does not match any known entity
    /// convention. The file is skipped, not fatal.
    #[error("unrecognized entity path: {}", .0.display())]
    UnknownEntity(PathBuf),

    /// Another process holds the sync lock for this workspace.
    #[error("sync already in progress (lock held by PID {pid})")]
    SyncInProgress {
        /// Process ID recorded in the lock file.
        pid: u32,
    },

    /// Invalid hex string for ContentHash parsing.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Serialization of a local state file failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// No active session cursor exists.
    #[error("no active session")]
    NoActiveSession,

    /// A session cursor is already active for this workspace.
    #[error("session already active: {0}")]
    SessionAlreadyActive(String),

    /// The directory is not a tether workspace.
    #[error("not a tether workspace: {}", .0.display())]
    NotAWorkspace(PathBuf),
}

impl TetherError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Transient(_) => {
                Some("The change was queued locally. Run 'tether push' once the network is back.")
            }
            Self::Auth(_) => {
                Some("Check the token referenced by [remote].token_env in .tether/config.toml.")
            }
            Self::StateCorrupted { .. } => Some(
                "Move .tether/sync-state.json aside and re-run 'tether push'; the next sync rebuilds it from scratch.",
            ),
            Self::QueueCorrupted { .. } => Some(
                "Inspect .tether/queue.json by hand; remove the malformed entry and re-run 'tether push'.",
            ),
            Self::SyncInProgress { .. } => Some(
                "Wait for the other invocation to finish, or remove .tether/LOCK if that process is dead.",
            ),
            Self::NoActiveSession => Some("Start one with 'tether session start'."),
            Self::SessionAlreadyActive(_) => {
                Some("Finish it with 'tether session end' before starting a new one.")
            }
            Self::NotAWorkspace(_) => Some("Run 'tether init' to create a workspace here."),
            _ => None,
        }
    }

    /// True if the error is scoped to a single entity and should not abort
    /// the rest of a push/pull batch.
    pub fn is_per_entity(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::UnknownEntity(_))
    }
}

/// Convenience Result type for tether_core operations.
pub type Result<T> = std::result::Result<T, TetherError>;
