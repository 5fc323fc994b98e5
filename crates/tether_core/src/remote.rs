//! Remote graph client: typed operations and wire types.
//!
//! Pipelines talk to the remote through the [`GraphRemote`] trait so tests
//! can substitute scripted fakes; [`crate::remote_http::HttpGraphClient`]
//! is the production implementation.
//!
//! Every write operation is idempotent by construction: upserts are keyed
//! by stable entity id, state patches are field-level, and event appends
//! carry a client-generated idempotency key so a retry after a timeout
//! cannot duplicate the event.

use crate::entity::{
    field_ownership, ContentFields, EntityId, EntityKind, EntityStatus, FieldOwnership,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Content-side payload for an idempotent upsert, keyed by entity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntity {
    /// Stable entity identifier.
    pub id: EntityId,
    /// Entity kind.
    pub kind: EntityKind,
    /// Content-owned fields (the only fields an upsert may carry).
    pub content: ContentFields,
}

/// A field-level patch of state-owned fields.
///
/// Patches never carry a whole document, so two clients changing unrelated
/// state fields cannot overwrite each other. Construction rejects fields
/// that are not state-owned for the target kind, which keeps the ownership
/// table enforced at the API seam rather than re-checked downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatePatch {
    fields: BTreeMap<String, Value>,
}

impl StatePatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the common status-only patch.
    pub fn status(status: EntityStatus) -> Self {
        let mut patch = Self::new();
        patch
            .fields
            .insert("status".to_string(), Value::String(status.as_str().to_string()));
        patch
    }

    /// Adds a state-owned field to the patch.
    ///
    /// Returns `false` (and leaves the patch unchanged) if the field is not
    /// state-owned for the given kind.
    pub fn set(&mut self, kind: EntityKind, field: &str, value: Value) -> bool {
        if field_ownership(kind, field) != Some(FieldOwnership::State) {
            return false;
        }
        self.fields.insert(field.to_string(), value);
        true
    }

    /// Returns the patched fields.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// True if the patch carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Category of an append-only event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Status transition.
    Status,
    /// Progress update.
    Progress,
    /// Free-form note.
    Note,
    /// Handoff between actors.
    Handoff,
    /// Session lifecycle.
    Session,
}

/// A new event, before the remote assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Entity the event belongs to.
    pub entity_id: EntityId,
    /// Event category.
    pub category: EventCategory,
    /// Human-readable description.
    pub description: String,
    /// Who produced the event (user name, "cli", "agent").
    pub actor: String,
    /// Client-generated key making retried appends safe.
    pub idempotency_key: Uuid,
}

impl EventDraft {
    /// Creates a draft with a fresh idempotency key.
    pub fn new(
        entity_id: EntityId,
        category: EventCategory,
        description: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            entity_id,
            category,
            description: description.into(),
            actor: actor.into(),
            idempotency_key: Uuid::new_v4(),
        }
    }
}

/// An event as stored remotely: immutable, append-only, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Server-assigned event id, ordered by append sequence.
    pub id: String,
    /// Entity the event belongs to.
    pub entity_id: EntityId,
    /// Server-assigned Unix timestamp.
    pub timestamp: i64,
    /// Event category.
    pub category: EventCategory,
    /// Human-readable description.
    pub description: String,
    /// Who produced the event.
    pub actor: String,
}

/// State-owned fields of one entity as the remote currently holds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    /// Entity identifier.
    pub entity_id: EntityId,
    /// Monotonic version, bumped by the remote on every state write.
    pub version: u64,
    /// State-owned field values.
    pub fields: BTreeMap<String, Value>,
}

/// One page of the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events after the requested cursor, in append order.
    pub events: Vec<EventRecord>,
    /// Cursor for the next page; `None` when the stream is exhausted.
    pub next_cursor: Option<String>,
}

/// Typed operations against the remote graph service.
///
/// Implementations must be safe to call from the push worker pool, hence
/// `Send + Sync`.
pub trait GraphRemote: Send + Sync {
    /// Idempotent upsert of content-owned fields, keyed by entity id.
    fn upsert_content(&self, entity: &RemoteEntity) -> Result<()>;

    /// Field-level patch of state-owned fields. Returns the new state
    /// version assigned by the remote.
    fn patch_state(&self, entity_id: &EntityId, patch: &StatePatch) -> Result<u64>;

    /// Appends an event; duplicate idempotency keys return the original
    /// record instead of appending again.
    fn append_event(&self, event: &EventDraft) -> Result<EventRecord>;

    /// Fetches the current state of one entity, `None` if the remote has
    /// never seen it.
    fn fetch_state(&self, entity_id: &EntityId) -> Result<Option<RemoteState>>;

    /// Fetches events after the cursor, oldest first, at most `limit`.
    fn fetch_events_since(&self, cursor: Option<&str>, limit: usize) -> Result<EventPage>;

    /// Cheap reachability check used by the auto-push hook. Never errors;
    /// an unreachable remote simply returns `false`.
    fn probe(&self) -> bool;
}
