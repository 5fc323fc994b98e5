//! Offline queue: durable FIFO of pending remote writes.
//!
//! When the remote is unreachable, state patches and event appends land
//! here instead of failing the originating command. The queue is drained
//! front-to-back at the next push; because every remote write is
//! idempotent, draining twice after a crash mid-drain is harmless.

use crate::entity::{EntityId, EntityKind};
use crate::error::{Result, TetherError};
use crate::remote::{EventDraft, StatePatch};
use crate::sync_state::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Bumped when the on-disk layout changes incompatibly.
pub const QUEUE_SCHEMA_VERSION: u32 = 1;

/// A pending remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueuedOp {
    /// Field-level state patch for one entity.
    PatchState {
        /// Target entity.
        entity_id: EntityId,
        /// Entity kind (for reporting).
        entity_type: EntityKind,
        /// The patch to apply.
        patch: StatePatch,
    },
    /// Event append; the draft keeps its original idempotency key so a
    /// queued event is applied exactly once no matter how often the queue
    /// is replayed.
    AppendEvent {
        /// The event to append.
        draft: EventDraft,
    },
}

impl QueuedOp {
    /// Entity the operation belongs to.
    pub fn entity_id(&self) -> &EntityId {
        match self {
            QueuedOp::PatchState { entity_id, .. } => entity_id,
            QueuedOp::AppendEvent { draft } => &draft.entity_id,
        }
    }
}

/// One queue entry with its enqueue timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The pending operation.
    pub op: QueuedOp,
    /// Unix timestamp when the operation was enqueued.
    pub enqueued_at: i64,
}

/// On-disk envelope for the queue file.
#[derive(Debug, Serialize, Deserialize)]
struct QueueFile {
    schema_version: u32,
    entries: Vec<QueueEntry>,
}

/// Durable FIFO queue backed by a single JSON file.
pub struct OfflineQueue {
    path: PathBuf,
    entries: VecDeque<QueueEntry>,
}

impl OfflineQueue {
    /// Loads the queue, or starts empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `QueueCorrupted` if the file exists but cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Ok(Self {
                path,
                entries: VecDeque::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let file: QueueFile =
            serde_json::from_str(&content).map_err(|e| TetherError::QueueCorrupted {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if file.schema_version != QUEUE_SCHEMA_VERSION {
            return Err(TetherError::QueueCorrupted {
                path,
                reason: format!(
                    "unsupported schema version {} (expected {})",
                    file.schema_version, QUEUE_SCHEMA_VERSION
                ),
            });
        }

        Ok(Self {
            path,
            entries: file.entries.into(),
        })
    }

    /// Appends an operation and persists immediately.
    ///
    /// Durability before return is the point of the queue: once `enqueue`
    /// succeeds, the operation survives a crash of the CLI process.
    pub fn enqueue(&mut self, op: QueuedOp, now: i64) -> Result<()> {
        self.entries.push_back(QueueEntry {
            op,
            enqueued_at: now,
        });
        self.save()
    }

    /// Returns the front entry without removing it.
    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    /// Removes the front entry and persists the shortened queue.
    pub fn pop_front(&mut self) -> Result<Option<QueueEntry>> {
        let entry = self.entries.pop_front();
        if entry.is_some() {
            self.save()?;
        }
        Ok(entry)
    }

    /// Number of pending operations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates pending entries front-to-back.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    fn save(&self) -> Result<()> {
        let file = QueueFile {
            schema_version: QUEUE_SCHEMA_VERSION,
            entries: self.entries.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| TetherError::Serialization(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityStatus;
    use crate::remote::EventCategory;
    use tempfile::TempDir;

    fn patch_op(id: &str) -> QueuedOp {
        QueuedOp::PatchState {
            entity_id: EntityId::new(id),
            entity_type: EntityKind::Task,
            patch: StatePatch::status(EntityStatus::Complete),
        }
    }

    #[test]
    fn test_empty_when_missing() {
        let tmp = TempDir::new().unwrap();
        let queue = OfflineQueue::load(tmp.path().join("queue.json")).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_order_survives_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("queue.json");

        let mut queue = OfflineQueue::load(&path).unwrap();
        queue.enqueue(patch_op("TASK-01"), 1).unwrap();
        queue.enqueue(patch_op("TASK-02"), 2).unwrap();

        let mut reloaded = OfflineQueue::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);

        let first = reloaded.pop_front().unwrap().unwrap();
        assert_eq!(first.op.entity_id().as_str(), "TASK-01");
        let second = reloaded.pop_front().unwrap().unwrap();
        assert_eq!(second.op.entity_id().as_str(), "TASK-02");
    }

    #[test]
    fn test_pop_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("queue.json");

        let mut queue = OfflineQueue::load(&path).unwrap();
        queue.enqueue(patch_op("TASK-01"), 1).unwrap();
        queue.pop_front().unwrap();

        let reloaded = OfflineQueue::load(&path).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_event_keeps_idempotency_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("queue.json");

        let draft = EventDraft::new(
            EntityId::new("TASK-01"),
            EventCategory::Status,
            "completed",
            "cli",
        );
        let key = draft.idempotency_key;

        let mut queue = OfflineQueue::load(&path).unwrap();
        queue.enqueue(QueuedOp::AppendEvent { draft }, 1).unwrap();

        let reloaded = OfflineQueue::load(&path).unwrap();
        match &reloaded.front().unwrap().op {
            QueuedOp::AppendEvent { draft } => assert_eq!(draft.idempotency_key, key),
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_corrupted_queue_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("queue.json");
        fs::write(&path, "[[").unwrap();

        let result = OfflineQueue::load(&path);
        assert!(matches!(result, Err(TetherError::QueueCorrupted { .. })));
    }
}
