//! Local read caches for remote-authoritative data.
//!
//! The state cache mirrors state-owned fields so read-path commands work
//! offline; the event cache mirrors the append-only event stream. Both are
//! caches of the remote, never sources of truth, and pull overwrites them
//! freely. Content files are never written here.

use crate::entity::EntityId;
use crate::error::{Result, TetherError};
use crate::remote::EventRecord;
use crate::sync_state::write_atomic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Cached state-owned fields of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedState {
    /// Remote state version this snapshot reflects.
    pub version: u64,
    /// State-owned field values.
    pub fields: BTreeMap<String, Value>,
    /// Unix timestamp of the pull that wrote this snapshot.
    pub pulled_at: i64,
}

/// Read cache of state-owned fields, one JSON file for the whole project.
pub struct StateCache {
    path: PathBuf,
    entries: BTreeMap<EntityId, CachedState>,
}

impl StateCache {
    /// Loads the cache, or starts empty if the file does not exist.
    ///
    /// A malformed cache file is not fatal: it is a rebuildable mirror, so
    /// it is discarded with a warning and repopulated by the next pull.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let entries = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding malformed state cache");
                BTreeMap::new()
            }
        };

        Ok(Self { path, entries })
    }

    /// Returns the cached state for an entity.
    pub fn get(&self, entity_id: &EntityId) -> Option<&CachedState> {
        self.entries.get(entity_id)
    }

    /// Replaces the cached state for an entity. Call `save` to persist.
    pub fn put(&mut self, entity_id: EntityId, state: CachedState) {
        self.entries.insert(entity_id, state);
    }

    /// Removes a cached entry.
    pub fn remove(&mut self, entity_id: &EntityId) {
        self.entries.remove(entity_id);
    }

    /// All cached entries, sorted by entity id.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &CachedState)> {
        self.entries.iter()
    }

    /// Persists the cache atomically.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| TetherError::Serialization(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
    }
}

/// Append-only mirror of the remote event stream, one JSON object per line.
///
/// The read cursor is implicit: the id of the last cached line. Appending
/// the same page twice is therefore self-correcting, because pull always
/// asks for events after the last cached id.
pub struct EventCache {
    path: PathBuf,
}

impl EventCache {
    /// Creates a handle; the backing file is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the id of the last cached event, the pull cursor.
    pub fn last_event_id(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = fs::File::open(&self.path)?;
        let mut last = None;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(&line) {
                Ok(event) => last = Some(event.id),
                Err(e) => {
                    warn!(error = %e, "skipping malformed line in event cache");
                }
            }
        }
        Ok(last)
    }

    /// Appends a batch of events in order.
    pub fn append(&self, events: &[EventRecord]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for event in events {
            let line = serde_json::to_string(event)
                .map_err(|e| TetherError::Serialization(e.to_string()))?;
            writeln!(file, "{}", line)?;
        }
        file.sync_all()?;
        Ok(())
    }

    /// Reads all cached events after the given id (or all, if `None`).
    pub fn read_since(&self, after: Option<&str>) -> Result<Vec<EventRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let file = fs::File::open(&self.path)?;
        let mut events = Vec::new();
        let mut past_cursor = after.is_none();

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: EventRecord = match serde_json::from_str(&line) {
                Ok(event) => event,
                Err(_) => continue,
            };

            if past_cursor {
                events.push(event);
            } else if Some(event.id.as_str()) == after {
                past_cursor = true;
            }
        }

        Ok(events)
    }
}
