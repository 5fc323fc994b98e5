//! Sync state store: local bookkeeping of what has been exchanged with the
//! remote, enabling idempotent, resumable sync.
//!
//! The store is a single JSON file, rewritten whole via temp-then-rename so
//! a crash mid-write never leaves a torn file. Writes are last-write-wins
//! per entity and single-writer: the CLI process owns the file exclusively
//! for the duration of a sync cycle (see the workspace lock).

use crate::entity::{EntityId, EntityKind};
use crate::error::{Result, TetherError};
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Bumped when the on-disk layout changes incompatibly.
pub const SYNC_STATE_SCHEMA_VERSION: u32 = 1;

/// Per-entity sync bookkeeping.
///
/// `last_pushed_hash` always reflects a content hash that is known to exist
/// remotely: it is only updated after a confirmed remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStateRecord {
    /// Stable entity identifier.
    pub entity_id: EntityId,
    /// Entity kind.
    pub entity_type: EntityKind,
    /// Content hash confirmed to exist remotely, if any push succeeded.
    pub last_pushed_hash: Option<ContentHash>,
    /// Remote state version observed by the last pull, if any.
    pub last_pulled_version: Option<u64>,
    /// Unix timestamp of the last successful push or pull for this entity.
    pub last_synced_at: i64,
}

impl SyncStateRecord {
    /// Creates a fresh record for an entity seen for the first time.
    pub fn new(entity_id: EntityId, entity_type: EntityKind) -> Self {
        Self {
            entity_id,
            entity_type,
            last_pushed_hash: None,
            last_pulled_version: None,
            last_synced_at: 0,
        }
    }
}

/// On-disk envelope for the sync-state file.
#[derive(Debug, Serialize, Deserialize)]
struct SyncStateFile {
    schema_version: u32,
    records: Vec<SyncStateRecord>,
}

/// Store of `SyncStateRecord`s backed by a single JSON file.
pub struct SyncStateStore {
    path: PathBuf,
    records: BTreeMap<EntityId, SyncStateRecord>,
}

impl SyncStateStore {
    /// Loads the store from the given file, or starts empty if the file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `StateCorrupted` if the file exists but cannot be parsed:
    /// sync must not proceed on top of a store it cannot trust.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Ok(Self {
                path,
                records: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let file: SyncStateFile =
            serde_json::from_str(&content).map_err(|e| TetherError::StateCorrupted {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if file.schema_version != SYNC_STATE_SCHEMA_VERSION {
            return Err(TetherError::StateCorrupted {
                path,
                reason: format!(
                    "unsupported schema version {} (expected {})",
                    file.schema_version, SYNC_STATE_SCHEMA_VERSION
                ),
            });
        }

        let records = file
            .records
            .into_iter()
            .map(|r| (r.entity_id.clone(), r))
            .collect();

        Ok(Self { path, records })
    }

    /// Returns the record for an entity, if one exists.
    pub fn get(&self, entity_id: &EntityId) -> Option<&SyncStateRecord> {
        self.records.get(entity_id)
    }

    /// Inserts or replaces a record. Call `save` to persist.
    pub fn put(&mut self, record: SyncStateRecord) {
        self.records.insert(record.entity_id.clone(), record);
    }

    /// Removes a record. Only done on entity deletion.
    pub fn remove(&mut self, entity_id: &EntityId) -> Option<SyncStateRecord> {
        self.records.remove(entity_id)
    }

    /// Returns all records, sorted by entity id.
    pub fn list(&self) -> impl Iterator<Item = &SyncStateRecord> {
        self.records.values()
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no entity has been synced yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persists the whole store atomically (temp file + fsync + rename).
    pub fn save(&self) -> Result<()> {
        let file = SyncStateFile {
            schema_version: SYNC_STATE_SCHEMA_VERSION,
            records: self.records.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| TetherError::Serialization(e.to_string()))?;

        write_atomic(&self.path, json.as_bytes())
    }
}

/// Writes bytes to a path atomically: temp file + fsync + rename, then
/// fsync of the parent directory on Unix.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir_file) = File::open(parent) {
                let _ = dir_file.sync_all();
            }
        }
    }

    Ok(())
}
