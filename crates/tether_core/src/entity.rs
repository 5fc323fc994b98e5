//! Entity model: kinds, identifiers, and the field-ownership table.

use crate::document::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Type of entity tracked by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Top-level body of work.
    Epic,
    /// Time-boxed slice of an epic.
    Sprint,
    /// Individual unit of work.
    Task,
    /// Architecture decision record.
    Adr,
    /// Reusable implementation pattern.
    Pattern,
    /// Known pitfall worth remembering.
    Gotcha,
    /// Project charter document.
    Charter,
    /// Append-only activity record. Exists only in the remote store;
    /// mirrored locally as a read cache.
    Event,
}

impl EntityKind {
    /// All kinds that live as content files in the working tree.
    ///
    /// `Event` is excluded: events have no content side and are never
    /// detected from files.
    pub const FILE_BACKED: [EntityKind; 7] = [
        EntityKind::Epic,
        EntityKind::Sprint,
        EntityKind::Task,
        EntityKind::Adr,
        EntityKind::Pattern,
        EntityKind::Gotcha,
        EntityKind::Charter,
    ];

    /// Stable lowercase name, used in scopes and remote payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Epic => "epic",
            EntityKind::Sprint => "sprint",
            EntityKind::Task => "task",
            EntityKind::Adr => "adr",
            EntityKind::Pattern => "pattern",
            EntityKind::Gotcha => "gotcha",
            EntityKind::Charter => "charter",
            EntityKind::Event => "event",
        }
    }

    /// Parses a kind from its stable name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "epic" | "epics" => Some(EntityKind::Epic),
            "sprint" | "sprints" => Some(EntityKind::Sprint),
            "task" | "tasks" => Some(EntityKind::Task),
            "adr" | "adrs" => Some(EntityKind::Adr),
            "pattern" | "patterns" => Some(EntityKind::Pattern),
            "gotcha" | "gotchas" => Some(EntityKind::Gotcha),
            "charter" => Some(EntityKind::Charter),
            "event" | "events" => Some(EntityKind::Event),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable entity identifier, unique within a project (e.g. "TASK-0042").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an EntityId, normalizing to uppercase.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_uppercase())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which store is authoritative for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOwnership {
    /// Git-tracked file is the source of truth; the graph copy is a mirror.
    Content,
    /// Remote graph is the source of truth; the local copy is a read cache.
    State,
}

/// Content-owned field names shared by all file-backed kinds.
pub const CONTENT_FIELDS: [&str; 4] = ["title", "description", "acceptance_criteria", "approach"];

/// State-owned field names shared by all file-backed kinds.
///
/// Relationship edges (`parent`, `references`) are state-owned too: the
/// graph is authoritative for structure, only entity existence is
/// content-owned.
pub const STATE_FIELDS: [&str; 6] = [
    "status",
    "assignee",
    "progress",
    "updated_at",
    "parent",
    "references",
];

/// Looks up the ownership of a field for a given entity kind.
///
/// The split is a fixed table, never inferred and never changed at runtime.
/// A field name belongs to exactly one category per kind; unknown fields
/// return `None` and must not be synced in either direction.
pub fn field_ownership(kind: EntityKind, field: &str) -> Option<FieldOwnership> {
    // Events are pure remote-side records: every field is state-owned.
    if kind == EntityKind::Event {
        return Some(FieldOwnership::State);
    }

    if CONTENT_FIELDS.contains(&field) {
        return Some(FieldOwnership::Content);
    }
    if STATE_FIELDS.contains(&field) {
        return Some(FieldOwnership::State);
    }
    None
}

/// Operational status of an entity, remote-authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Not started.
    Open,
    /// Actively worked on.
    InProgress,
    /// Started but intentionally parked.
    Paused,
    /// Finished.
    Complete,
    /// Content file was deleted locally; the remote node is retired,
    /// never hard-deleted.
    Archived,
}

impl EntityStatus {
    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Open => "open",
            EntityStatus::InProgress => "in_progress",
            EntityStatus::Paused => "paused",
            EntityStatus::Complete => "complete",
            EntityStatus::Archived => "archived",
        }
    }
}

/// Content-owned fields extracted from an entity's markdown file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFields {
    /// Title from the first `#` heading.
    pub title: Option<String>,
    /// Prose between the title and the first section.
    pub description: Option<String>,
    /// The `## Acceptance Criteria` section.
    pub acceptance_criteria: Option<String>,
    /// The `## Approach` section.
    pub approach: Option<String>,
}

impl ContentFields {
    /// Extracts content fields from a parsed document.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            title: doc.title(),
            description: doc.description(),
            acceptance_criteria: doc.section("Acceptance Criteria"),
            approach: doc.section("Approach"),
        }
    }
}

/// A classified, file-backed entity ready to push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Stable identifier.
    pub id: EntityId,
    /// Entity kind.
    pub kind: EntityKind,
    /// Path of the backing file, relative to the workspace root.
    pub path: PathBuf,
    /// Content-owned fields.
    pub content: ContentFields,
}
