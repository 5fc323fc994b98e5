//! Entity classification from path conventions.
//!
//! The mapping from file paths to entity kinds is a fixed convention, not
//! inferred from file contents. Paths that match no convention classify as
//! unknown and are excluded from sync (logged, never fatal).

use crate::entity::{EntityId, EntityKind};
use std::path::Path;
use tracing::debug;

/// Content directories scanned by the change detector, in scan order.
///
/// Each maps a directory of markdown files to an entity kind. The charter
/// is a single well-known file rather than a directory.
pub const CONTENT_DIRS: [(&str, EntityKind); 6] = [
    ("epics", EntityKind::Epic),
    ("sprints", EntityKind::Sprint),
    ("tasks", EntityKind::Task),
    ("adr", EntityKind::Adr),
    ("patterns", EntityKind::Pattern),
    ("gotchas", EntityKind::Gotcha),
];

/// Well-known charter file at the workspace root.
pub const CHARTER_FILE: &str = "charter.md";

/// Result of classifying a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Stable entity identifier derived from the path.
    pub id: EntityId,
    /// Entity kind derived from the containing directory.
    pub kind: EntityKind,
}

/// Classifies a workspace-relative path into an entity kind and identifier.
///
/// Returns `None` for paths outside the content conventions; callers skip
/// those files. Identifiers come from the file stem, uppercased, so
/// `tasks/task-0042.md` and `tasks/TASK-0042.md` name the same entity.
pub fn classify(path: &Path) -> Option<Classification> {
    if path.extension().and_then(|e| e.to_str()) != Some("md") {
        debug!(path = %path.display(), "skipping non-markdown file");
        return None;
    }

    if path == Path::new(CHARTER_FILE) {
        return Some(Classification {
            id: EntityId::new("CHARTER"),
            kind: EntityKind::Charter,
        });
    }

    let mut components = path.components();
    let dir = components.next()?.as_os_str().to_str()?;
    let kind = CONTENT_DIRS
        .iter()
        .find(|(name, _)| *name == dir)
        .map(|(_, kind)| *kind)?;

    // Only one level of nesting: dir/FILE.md
    let file = components.next()?.as_os_str().to_str()?;
    if components.next().is_some() {
        debug!(path = %path.display(), "skipping nested path");
        return None;
    }

    let stem = Path::new(file).file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }

    Some(Classification {
        id: EntityId::new(stem),
        kind,
    })
}
