use crate::harness::{ScriptedRemote, TestWorkspace};
use serde_json::json;
use tether_core::{EntityId, EntityStatus, SyncScope};

/// The canonical task lifecycle: a content edit flows outward as exactly
/// one upsert, a status change flows as exactly one patch, and neither
/// direction disturbs the other side's fields.
#[test]
fn test_task_lifecycle_round_trip() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task(
        "task-01",
        "# Fix login flow\n\nSessions expire too eagerly.\n\n## Acceptance Criteria\n\n- stays logged in\n",
    )
    .unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    // Content edit pushed: one upsert, zero state patches.
    let report = ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(report.pushed.len(), 1);
    assert_eq!(remote.upsert_count(), 1);
    assert_eq!(remote.patch_count(), 0);

    let upserted = &remote.upserted_ids();
    assert_eq!(upserted[0].as_str(), "TASK-01");

    // Status change: one patch, zero upserts, plus its companion event.
    ws.mutate_status(
        &remote,
        &EntityId::new("TASK-01"),
        EntityStatus::Complete,
        "tester",
    )
    .unwrap();
    assert_eq!(remote.patch_count(), 1);
    assert_eq!(remote.upsert_count(), 1);
    assert_eq!(remote.event_count(), 1);

    // Pull brings the authoritative state (and the event) back down.
    let pull = ws.pull(&remote, &SyncScope::All).unwrap();
    assert_eq!(pull.updated.len(), 1);
    assert_eq!(pull.events_fetched, 1);

    let cache = ws.state_cache().unwrap();
    let cached = cache.get(&EntityId::new("TASK-01")).unwrap();
    assert_eq!(cached.fields.get("status"), Some(&json!("complete")));

    // And the whole cycle settles: nothing left to push or pull.
    assert!(ws.push(&remote, &SyncScope::All).unwrap().pushed.is_empty());
    assert!(ws.pull(&remote, &SyncScope::All).unwrap().updated.is_empty());
}
