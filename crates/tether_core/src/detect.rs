//! Change detection: diffs the working tree against the sync-state store.
//!
//! Detection is scoped to the known content directories and the charter
//! file; it never rescans unrelated parts of the tree. Comparison is by
//! front-matter-stripped content hash against `last_pushed_hash`, so a
//! pull write-back of state metadata never shows up as a local change.

use crate::classify::{classify, CHARTER_FILE, CONTENT_DIRS};
use crate::document::Document;
use crate::entity::{ContentFields, EntityId, EntityKind};
use crate::error::Result;
use crate::hash::ContentHash;
use crate::sync_state::SyncStateStore;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// What happened to an entity's content file since the last push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// No sync-state record exists for this entity.
    Created,
    /// Content hash differs from `last_pushed_hash`.
    Modified,
    /// A record exists but the file is gone.
    Deleted,
}

/// One changed entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Stable entity identifier.
    pub entity_id: EntityId,
    /// Entity kind.
    pub entity_type: EntityKind,
    /// Path of the backing file, relative to the workspace root.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
    /// New content hash (`None` for deletions).
    pub new_hash: Option<ContentHash>,
    /// Extracted content fields (`None` for deletions).
    pub content: Option<ContentFields>,
}

/// Restricts a push or pull to a subset of entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// All entities.
    All,
    /// Every entity of one kind.
    Kind(EntityKind),
    /// A single entity.
    Entity(EntityId),
}

impl SyncScope {
    /// Parses a scope argument: an entity kind name ("task", "epics") or a
    /// specific id ("TASK-0042"). Anything that is not a kind name is
    /// treated as an id.
    pub fn parse(s: &str) -> Self {
        match EntityKind::parse(s) {
            Some(kind) => SyncScope::Kind(kind),
            None => SyncScope::Entity(EntityId::new(s)),
        }
    }

    /// True if the scope includes the given entity.
    pub fn includes(&self, id: &EntityId, kind: EntityKind) -> bool {
        match self {
            SyncScope::All => true,
            SyncScope::Kind(k) => *k == kind,
            SyncScope::Entity(e) => e == id,
        }
    }
}

/// Diffs the working tree against the sync-state store.
///
/// Unreadable files are skipped with a warning; one bad file never aborts
/// the batch. Returned changes are sorted by entity id for deterministic
/// output.
pub fn detect_changes(
    root: &Path,
    sync_state: &SyncStateStore,
    scope: &SyncScope,
) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    let mut seen: BTreeSet<EntityId> = BTreeSet::new();

    for path in candidate_files(root)? {
        let Some(classification) = classify(&path) else {
            warn!(path = %path.display(), "unclassifiable file in content directory, skipping");
            continue;
        };

        if !scope.includes(&classification.id, classification.kind) {
            continue;
        }

        let raw = match fs::read_to_string(root.join(&path)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable content file, skipping");
                continue;
            }
        };

        let doc = Document::parse(&raw);
        let new_hash = doc.content_hash();
        seen.insert(classification.id.clone());

        let kind = match sync_state.get(&classification.id) {
            None => ChangeKind::Created,
            Some(record) if record.last_pushed_hash != Some(new_hash) => ChangeKind::Modified,
            Some(_) => continue,
        };

        changes.push(Change {
            entity_id: classification.id,
            entity_type: classification.kind,
            path,
            kind,
            new_hash: Some(new_hash),
            content: Some(ContentFields::from_document(&doc)),
        });
    }

    // Records with no backing file are deletions. Only entities that were
    // actually pushed count; a record without a pushed hash has nothing to
    // archive remotely.
    for record in sync_state.list() {
        if record.entity_type == EntityKind::Event || seen.contains(&record.entity_id) {
            continue;
        }
        if !scope.includes(&record.entity_id, record.entity_type) {
            continue;
        }
        if record.last_pushed_hash.is_none() {
            continue;
        }

        changes.push(Change {
            entity_id: record.entity_id.clone(),
            entity_type: record.entity_type,
            path: PathBuf::new(),
            kind: ChangeKind::Deleted,
            new_hash: None,
            content: None,
        });
    }

    changes.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
    Ok(changes)
}

/// Enumerates candidate content files (workspace-relative), without
/// touching anything outside the content conventions.
fn candidate_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for (dir, _) in CONTENT_DIRS {
        let abs = root.join(dir);
        if !abs.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&abs)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                files.push(PathBuf::from(dir).join(entry.file_name()));
            }
        }
    }

    if root.join(CHARTER_FILE).is_file() {
        files.push(PathBuf::from(CHARTER_FILE));
    }

    files.sort();
    Ok(files)
}
