//! Push pipeline: detect, classify, upsert, record.
//!
//! Content flows git to graph only. Changed files become idempotent
//! content upserts; locally deleted files archive the remote node rather
//! than hard-deleting it; state-owned fields are never pushed from files,
//! only from explicit status-mutation commands via the offline queue.
//!
//! Per-entity errors are collected and reported at the end
//! (continue-on-error); only authentication and local I/O failures abort
//! the invocation. `last_pushed_hash` is recorded only after the remote
//! confirms the write, so an interrupted run is safely resumable.

use crate::detect::{detect_changes, Change, ChangeKind, SyncScope};
use crate::entity::{EntityId, EntityKind, EntityStatus};
use crate::error::{Result, TetherError};
use crate::hash::ContentHash;
use crate::queue::{OfflineQueue, QueuedOp};
use crate::remote::{GraphRemote, RemoteEntity, StatePatch};
use crate::sync_state::{SyncStateRecord, SyncStateStore};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{info, warn};

/// Aggregated result of one push invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// Entities whose content (or archival) reached the remote.
    pub pushed: Vec<EntityId>,
    /// Tracked entities in scope with no changes to push.
    pub skipped: usize,
    /// Per-entity failures: (entity, reason).
    pub failed: Vec<(EntityId, String)>,
    /// Queued offline operations applied during this push.
    pub drained: usize,
}

impl PushReport {
    /// True if every attempted operation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of pushing one entity, applied to the sync-state store on the
/// coordinating thread.
enum WorkOutcome {
    Upserted {
        entity_id: EntityId,
        entity_type: EntityKind,
        hash: ContentHash,
    },
    Archived {
        entity_id: EntityId,
    },
    Failed {
        entity_id: EntityId,
        error: TetherError,
    },
}

/// Runs the push pipeline.
///
/// Drains the offline queue first so earlier status mutations land before
/// newer content, then pushes detected content changes through a bounded
/// worker pool sharded by entity id: independent entities run in
/// parallel, one entity's operations stay strictly ordered.
pub fn push(
    root: &std::path::Path,
    sync_state: &mut SyncStateStore,
    queue: &mut OfflineQueue,
    remote: &dyn GraphRemote,
    scope: &SyncScope,
    workers: usize,
    now: i64,
) -> Result<PushReport> {
    let mut report = PushReport::default();

    drain_queue(queue, remote, &mut report)?;

    let changes = detect_changes(root, sync_state, scope)?;
    report.skipped = count_unchanged(sync_state, scope, &changes);

    if changes.is_empty() {
        sync_state.save()?;
        return Ok(report);
    }

    let outcomes = run_sharded(changes, remote, workers.max(1));

    let mut auth_failure = None;
    for outcome in outcomes {
        match outcome {
            WorkOutcome::Upserted {
                entity_id,
                entity_type,
                hash,
            } => {
                let mut record = sync_state
                    .get(&entity_id)
                    .cloned()
                    .unwrap_or_else(|| SyncStateRecord::new(entity_id.clone(), entity_type));
                record.last_pushed_hash = Some(hash);
                record.last_synced_at = now;
                sync_state.put(record);
                report.pushed.push(entity_id);
            }
            WorkOutcome::Archived { entity_id } => {
                sync_state.remove(&entity_id);
                report.pushed.push(entity_id);
            }
            WorkOutcome::Failed { entity_id, error } => {
                if matches!(error, TetherError::Auth(_)) && auth_failure.is_none() {
                    auth_failure = Some(error);
                } else {
                    warn!(entity = %entity_id, error = %error, "push failed for entity");
                    report.failed.push((entity_id, error.to_string()));
                }
            }
        }
    }

    report.pushed.sort();
    report.failed.sort_by(|a, b| a.0.cmp(&b.0));

    // Successful entities are recorded even when the invocation aborts on
    // an auth failure: the store stays consistent with what the remote
    // actually accepted.
    sync_state.save()?;

    if let Some(error) = auth_failure {
        return Err(error);
    }

    info!(
        pushed = report.pushed.len(),
        skipped = report.skipped,
        failed = report.failed.len(),
        drained = report.drained,
        "push complete"
    );
    Ok(report)
}

/// Applies queued offline operations front-to-back.
///
/// A transient failure stops the drain and leaves the remaining entries
/// queued for next time; a validation failure drops the poisoned entry
/// (it can never succeed) and continues; an auth failure aborts.
fn drain_queue(
    queue: &mut OfflineQueue,
    remote: &dyn GraphRemote,
    report: &mut PushReport,
) -> Result<()> {
    while let Some(entry) = queue.front() {
        let result = match &entry.op {
            QueuedOp::PatchState {
                entity_id, patch, ..
            } => remote.patch_state(entity_id, patch).map(|_| ()),
            QueuedOp::AppendEvent { draft } => remote.append_event(draft).map(|_| ()),
        };

        match result {
            Ok(()) => {
                queue.pop_front()?;
                report.drained += 1;
            }
            Err(TetherError::Transient(msg)) => {
                warn!(pending = queue.len(), "remote unreachable, queue drain deferred: {}", msg);
                break;
            }
            Err(err @ TetherError::Auth(_)) => return Err(err),
            Err(error) => {
                let entity_id = entry.op.entity_id().clone();
                warn!(entity = %entity_id, error = %error, "dropping unplayable queued operation");
                report.failed.push((entity_id, error.to_string()));
                queue.pop_front()?;
            }
        }
    }

    Ok(())
}

/// Runs changes through a bounded worker pool, sharded by entity id.
fn run_sharded(changes: Vec<Change>, remote: &dyn GraphRemote, workers: usize) -> Vec<WorkOutcome> {
    let mut shards: Vec<Vec<Change>> = (0..workers).map(|_| Vec::new()).collect();
    for change in changes {
        let shard = shard_of(&change.entity_id, workers);
        shards[shard].push(change);
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = shards
            .into_iter()
            .filter(|shard| !shard.is_empty())
            .map(|shard| scope.spawn(move || shard.into_iter().map(|c| push_one(c, remote)).collect::<Vec<_>>()))
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().expect("push worker panicked"))
            .collect()
    })
}

/// Stable shard assignment so one entity never runs on two workers.
fn shard_of(entity_id: &EntityId, workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    entity_id.hash(&mut hasher);
    (hasher.finish() % workers as u64) as usize
}

/// Pushes a single change.
fn push_one(change: Change, remote: &dyn GraphRemote) -> WorkOutcome {
    match change.kind {
        ChangeKind::Created | ChangeKind::Modified => {
            let (Some(hash), Some(content)) = (change.new_hash, change.content) else {
                return WorkOutcome::Failed {
                    entity_id: change.entity_id,
                    error: TetherError::Serialization("change missing content".to_string()),
                };
            };

            let entity = RemoteEntity {
                id: change.entity_id.clone(),
                kind: change.entity_type,
                content,
            };

            match remote.upsert_content(&entity) {
                Ok(()) => WorkOutcome::Upserted {
                    entity_id: change.entity_id,
                    entity_type: change.entity_type,
                    hash,
                },
                Err(error) => WorkOutcome::Failed {
                    entity_id: change.entity_id,
                    error,
                },
            }
        }
        ChangeKind::Deleted => {
            let patch = StatePatch::status(EntityStatus::Archived);
            match remote.patch_state(&change.entity_id, &patch) {
                Ok(_) => WorkOutcome::Archived {
                    entity_id: change.entity_id,
                },
                Err(error) => WorkOutcome::Failed {
                    entity_id: change.entity_id,
                    error,
                },
            }
        }
    }
}

/// Tracked entities in scope that had nothing to push.
fn count_unchanged(sync_state: &SyncStateStore, scope: &SyncScope, changes: &[Change]) -> usize {
    sync_state
        .list()
        .filter(|r| r.entity_type != EntityKind::Event)
        .filter(|r| scope.includes(&r.entity_id, r.entity_type))
        .filter(|r| !changes.iter().any(|c| c.entity_id == r.entity_id))
        .count()
}
