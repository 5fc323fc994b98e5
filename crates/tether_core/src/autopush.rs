//! Auto-push hook: best-effort propagation of status mutations.
//!
//! Invoked synchronously by status-mutating command handlers, but never on
//! their failure path: sync is eventual consistency, not a transactional
//! co-requirement. If the remote answers a cheap probe, the patch goes out
//! inline; otherwise it lands in the offline queue and the command returns
//! immediately.

use crate::entity::{EntityId, EntityKind};
use crate::queue::{OfflineQueue, QueuedOp};
use crate::remote::{EventDraft, GraphRemote, StatePatch};
use tracing::{debug, error, warn};

/// What the hook did with the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPushOutcome {
    /// Pushed inline; the remote confirmed.
    Applied,
    /// Remote unreachable (or the inline attempt failed); queued durably.
    Queued,
    /// Both the inline push and the queue write failed. The local mutation
    /// stands; the remote write is lost and logged.
    Dropped,
}

/// Enqueues a state patch plus its companion event, pushing inline when
/// the remote is reachable.
///
/// Infallible by contract: every failure degrades to the next tier
/// (inline, then queue, then log-and-drop) instead of propagating.
pub fn auto_push(
    queue: &mut OfflineQueue,
    remote: &dyn GraphRemote,
    entity_id: EntityId,
    entity_type: EntityKind,
    patch: StatePatch,
    event: Option<EventDraft>,
    now: i64,
) -> AutoPushOutcome {
    if remote.probe() {
        let patched = remote.patch_state(&entity_id, &patch);
        match patched {
            Ok(_) => {
                if let Some(event) = event {
                    if let Err(e) = remote.append_event(&event) {
                        warn!(entity = %entity_id, error = %e, "event append failed, queueing");
                        return enqueue_all(queue, None, Some(event), now);
                    }
                }
                debug!(entity = %entity_id, "auto-push applied inline");
                return AutoPushOutcome::Applied;
            }
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "inline auto-push failed, queueing");
            }
        }
    } else {
        debug!(entity = %entity_id, "remote unreachable, queueing auto-push");
    }

    enqueue_all(
        queue,
        Some(QueuedOp::PatchState {
            entity_id,
            entity_type,
            patch,
        }),
        event,
        now,
    )
}

fn enqueue_all(
    queue: &mut OfflineQueue,
    patch: Option<QueuedOp>,
    event: Option<EventDraft>,
    now: i64,
) -> AutoPushOutcome {
    let mut ops = Vec::new();
    if let Some(patch) = patch {
        ops.push(patch);
    }
    if let Some(draft) = event {
        ops.push(QueuedOp::AppendEvent { draft });
    }

    for op in ops {
        if let Err(e) = queue.enqueue(op, now) {
            error!(error = %e, "offline queue write failed, dropping auto-push");
            return AutoPushOutcome::Dropped;
        }
    }
    AutoPushOutcome::Queued
}
