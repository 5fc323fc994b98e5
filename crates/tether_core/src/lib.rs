//! Tether Core Library
//!
//! A sync engine keeping a git-tracked markdown planning workspace and a
//! remote graph database in agreement, providing:
//! - Content-hash change detection over planning documents
//! - Push/pull pipelines with field-level ownership rules
//! - A durable offline queue for status mutations
//! - Session cursors over the append-only event stream
//!
//! # Quick Start
//!
//! ```
//! use tether_core::{Config, TetherWorkspace};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let ws = TetherWorkspace::init(tmp.path(), Config::default()).unwrap();
//!
//! // The scaffold includes the tracked content directories.
//! assert!(ws.root().join("tasks").is_dir());
//! ```
//!
//! # Ownership Model
//!
//! Every field of every entity has exactly one authoritative side. Content
//! fields (title, description, acceptance criteria, approach) are owned by
//! the markdown files; state fields (status, assignee, progress) are owned
//! by the remote graph. Push writes only content, pull writes only state,
//! so the two directions can never fight over a field:
//!
//! ```
//! use tether_core::{field_ownership, EntityKind, FieldOwnership};
//!
//! assert_eq!(
//!     field_ownership(EntityKind::Task, "title"),
//!     Some(FieldOwnership::Content)
//! );
//! assert_eq!(
//!     field_ownership(EntityKind::Task, "status"),
//!     Some(FieldOwnership::State)
//! );
//! ```
//!
//! # Change Detection
//!
//! Documents hash only their body, after front matter is stripped, so
//! state metadata written back by pull never registers as a local edit:
//!
//! ```
//! use tether_core::Document;
//!
//! let plain = Document::parse("# Fix login\n\nDetails.");
//! let with_meta = Document::parse("---\nstatus: complete\n---\n# Fix login\n\nDetails.");
//! assert_eq!(plain.content_hash(), with_meta.content_hash());
//! ```

mod autopush;
mod cache;
mod classify;
mod config;
mod detect;
mod document;
mod entity;
mod error;
mod hash;
mod pull;
mod push;
mod queue;
mod remote;
mod remote_http;
mod session;
mod sync_state;
mod workspace;

pub use autopush::{auto_push, AutoPushOutcome};
pub use cache::{CachedState, EventCache, StateCache};
pub use classify::{classify, Classification, CHARTER_FILE, CONTENT_DIRS};
pub use config::{Config, RemoteConfig, SyncConfig, SyncContext};
pub use detect::{detect_changes, Change, ChangeKind, SyncScope};
pub use document::Document;
pub use entity::{
    field_ownership, ContentFields, Entity, EntityId, EntityKind, EntityStatus, FieldOwnership,
    CONTENT_FIELDS, STATE_FIELDS,
};
pub use error::{Result, TetherError};
pub use hash::ContentHash;
pub use pull::{pull, Conflict, PullReport};
pub use push::{push, PushReport};
pub use queue::{OfflineQueue, QueueEntry, QueuedOp, QUEUE_SCHEMA_VERSION};
pub use remote::{
    EventCategory, EventDraft, EventPage, EventRecord, GraphRemote, RemoteEntity, RemoteState,
    StatePatch,
};
pub use remote_http::HttpGraphClient;
pub use session::{CursorStatus, SessionCursor, SessionStore};
pub use sync_state::{SyncStateRecord, SyncStateStore, SYNC_STATE_SCHEMA_VERSION};
pub use workspace::{EntityStatusLine, StatusSummary, TetherWorkspace};
