//! Pull pipeline: fetch remote state into the local read cache.
//!
//! State-owned fields flow graph to git-cache only. Pull never writes a
//! content file, so in-progress local edits can never be clobbered. Where
//! the remote moved past what we last pulled and the cached value differs,
//! the remote wins by architectural decision; the difference is reported
//! as a conflict purely for visibility.

use crate::cache::{CachedState, EventCache, StateCache};
use crate::detect::SyncScope;
use crate::entity::{EntityId, EntityKind};
use crate::error::{Result, TetherError};
use crate::remote::GraphRemote;
use crate::sync_state::SyncStateStore;
use serde_json::Value;
use tracing::{info, warn};

/// A state field where the remote diverged from the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Entity the field belongs to.
    pub entity_id: EntityId,
    /// Field name.
    pub field: String,
    /// Value the local cache held.
    pub cached: Value,
    /// Value the remote holds (this one wins).
    pub remote: Value,
}

/// Aggregated result of one pull invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PullReport {
    /// Entities whose cached state was refreshed.
    pub updated: Vec<EntityId>,
    /// Entities whose remote state was already cached at the same version.
    pub unchanged: usize,
    /// Divergences observed while merging (informational; remote won).
    pub conflicts: Vec<Conflict>,
    /// Per-entity failures: (entity, reason).
    pub failed: Vec<(EntityId, String)>,
    /// New events appended to the local event cache.
    pub events_fetched: usize,
}

impl PullReport {
    /// True if every attempted fetch succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the pull pipeline over entities known to the sync-state store.
///
/// Per-entity failures are collected, not raised; auth failures abort.
pub fn pull(
    sync_state: &mut SyncStateStore,
    state_cache: &mut StateCache,
    event_cache: &EventCache,
    remote: &dyn GraphRemote,
    scope: &SyncScope,
    event_page_size: usize,
    now: i64,
) -> Result<PullReport> {
    let mut report = PullReport::default();

    let targets: Vec<(EntityId, EntityKind)> = sync_state
        .list()
        .filter(|r| r.entity_type != EntityKind::Event)
        .filter(|r| scope.includes(&r.entity_id, r.entity_type))
        .map(|r| (r.entity_id.clone(), r.entity_type))
        .collect();

    for (entity_id, _) in targets {
        match remote.fetch_state(&entity_id) {
            Ok(Some(state)) => {
                let record = sync_state
                    .get(&entity_id)
                    .cloned()
                    .expect("target came from the store");

                if record.last_pulled_version == Some(state.version) {
                    report.unchanged += 1;
                    continue;
                }

                collect_conflicts(&entity_id, state_cache, &state.fields, &record.last_pulled_version, &mut report);

                state_cache.put(
                    entity_id.clone(),
                    CachedState {
                        version: state.version,
                        fields: state.fields,
                        pulled_at: now,
                    },
                );

                let mut record = record;
                record.last_pulled_version = Some(state.version);
                record.last_synced_at = now;
                sync_state.put(record);
                report.updated.push(entity_id);
            }
            Ok(None) => {
                // Remote has never seen this entity; nothing to merge.
                report.unchanged += 1;
            }
            Err(err @ TetherError::Auth(_)) => {
                sync_state.save()?;
                state_cache.save()?;
                return Err(err);
            }
            Err(error) => {
                warn!(entity = %entity_id, error = %error, "pull failed for entity");
                report.failed.push((entity_id, error.to_string()));
            }
        }
    }

    pull_events(event_cache, remote, event_page_size, &mut report)?;

    report.updated.sort();
    sync_state.save()?;
    state_cache.save()?;

    info!(
        updated = report.updated.len(),
        unchanged = report.unchanged,
        conflicts = report.conflicts.len(),
        failed = report.failed.len(),
        events = report.events_fetched,
        "pull complete"
    );
    Ok(report)
}

/// Records fields where the cache diverged from what the remote now holds.
///
/// Only meaningful when we had pulled this entity before; a first pull has
/// no local expectation to conflict with.
fn collect_conflicts(
    entity_id: &EntityId,
    state_cache: &StateCache,
    remote_fields: &std::collections::BTreeMap<String, Value>,
    last_pulled_version: &Option<u64>,
    report: &mut PullReport,
) {
    if last_pulled_version.is_none() {
        return;
    }
    let Some(cached) = state_cache.get(entity_id) else {
        return;
    };

    for (field, remote_value) in remote_fields {
        if let Some(cached_value) = cached.fields.get(field) {
            if cached_value != remote_value {
                report.conflicts.push(Conflict {
                    entity_id: entity_id.clone(),
                    field: field.clone(),
                    cached: cached_value.clone(),
                    remote: remote_value.clone(),
                });
            }
        }
    }
}

/// Advances the event cache past its implicit cursor, page by page.
fn pull_events(
    event_cache: &EventCache,
    remote: &dyn GraphRemote,
    page_size: usize,
    report: &mut PullReport,
) -> Result<()> {
    let mut cursor = event_cache.last_event_id()?;

    loop {
        let page = match remote.fetch_events_since(cursor.as_deref(), page_size) {
            Ok(page) => page,
            Err(err @ TetherError::Auth(_)) => return Err(err),
            Err(error) => {
                warn!(error = %error, "event pull deferred");
                return Ok(());
            }
        };

        if page.events.is_empty() {
            return Ok(());
        }

        report.events_fetched += page.events.len();
        event_cache.append(&page.events)?;

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(()),
        }
    }
}
