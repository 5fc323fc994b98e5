//! Session cursors over the append-only event stream.
//!
//! A cursor is a movable read head, scoped to a user or branch. Resuming a
//! session means moving the head past the events read, never synthesizing
//! or rewriting a summary: the events themselves are the record.

use crate::cache::EventCache;
use crate::error::{Result, TetherError};
use crate::remote::EventRecord;
use crate::sync_state::write_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Lifecycle of a session cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorStatus {
    /// Cursor is live and advancing.
    Active,
    /// Cursor was explicitly ended; kept for inspection.
    Ended,
}

/// A named pointer into the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCursor {
    /// Cursor name, usually a user or branch label.
    pub cursor_id: String,
    /// Id of the last event this session has read; `None` before the
    /// first event.
    pub current_event_id: Option<String>,
    /// Unix timestamp of the last advance.
    pub last_active_at: i64,
    /// Lifecycle status.
    pub status: CursorStatus,
}

/// Persistent store for the workspace's session cursor.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Creates a handle; the backing file is created on session start.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the stored cursor, if any.
    pub fn get(&self) -> Result<Option<SessionCursor>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let cursor = serde_json::from_str(&content).map_err(|e| TetherError::StateCorrupted {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(cursor))
    }

    /// Returns the active cursor.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` if no cursor exists or it has ended.
    pub fn active(&self) -> Result<SessionCursor> {
        match self.get()? {
            Some(cursor) if cursor.status == CursorStatus::Active => Ok(cursor),
            _ => Err(TetherError::NoActiveSession),
        }
    }

    /// Starts a new session cursor positioned at the current end of the
    /// local event cache.
    ///
    /// # Errors
    ///
    /// Returns `SessionAlreadyActive` if an active cursor exists.
    pub fn start(
        &self,
        name: Option<&str>,
        event_cache: &EventCache,
        now: i64,
    ) -> Result<SessionCursor> {
        if let Some(existing) = self.get()? {
            if existing.status == CursorStatus::Active {
                return Err(TetherError::SessionAlreadyActive(existing.cursor_id));
            }
        }

        let cursor = SessionCursor {
            cursor_id: name
                .map(|n| n.to_string())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            current_event_id: event_cache.last_event_id()?,
            last_active_at: now,
            status: CursorStatus::Active,
        };
        self.save(&cursor)?;
        Ok(cursor)
    }

    /// Advances the active cursor to the given event id.
    pub fn advance(&self, event_id: &str, now: i64) -> Result<SessionCursor> {
        let mut cursor = self.active()?;
        cursor.current_event_id = Some(event_id.to_string());
        cursor.last_active_at = now;
        self.save(&cursor)?;
        Ok(cursor)
    }

    /// Reads events after the active cursor from the local cache and moves
    /// the head past them.
    ///
    /// This is "resume": the returned events are the context the session
    /// missed; the head now points at the newest one.
    pub fn resume(&self, event_cache: &EventCache, now: i64) -> Result<Vec<EventRecord>> {
        let cursor = self.active()?;
        let events = event_cache.read_since(cursor.current_event_id.as_deref())?;

        if let Some(last) = events.last() {
            self.advance(&last.id, now)?;
        }

        Ok(events)
    }

    /// Ends the active session cursor.
    pub fn end(&self, now: i64) -> Result<SessionCursor> {
        let mut cursor = self.active()?;
        cursor.status = CursorStatus::Ended;
        cursor.last_active_at = now;
        self.save(&cursor)?;
        Ok(cursor)
    }

    fn save(&self, cursor: &SessionCursor) -> Result<()> {
        let json = serde_json::to_string_pretty(cursor)
            .map_err(|e| TetherError::Serialization(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
    }
}
