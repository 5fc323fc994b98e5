use crate::harness::{ScriptedRemote, TestWorkspace};
use serde_json::json;
use tether_core::{AutoPushOutcome, EntityId, EntityStatus, SyncScope};

#[test]
fn test_offline_mutation_queues_and_push_drains() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# One\n\nFirst.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    ws.push(&remote, &SyncScope::All).unwrap();

    remote.set_online(false);
    let outcome = ws
        .mutate_status(
            &remote,
            &EntityId::new("TASK-01"),
            EntityStatus::Complete,
            "tester",
        )
        .unwrap();
    assert_eq!(outcome, AutoPushOutcome::Queued);

    // The mutation is visible locally despite the outage.
    let summary = ws.status_summary().unwrap();
    assert_eq!(summary.entities[0].status.as_deref(), Some("complete"));
    assert_eq!(summary.queue_depth, 2); // patch + companion event
    assert_eq!(remote.patch_count(), 0);

    // Connectivity returns; the next push drains the queue first.
    remote.set_online(true);
    let report = ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(report.drained, 2);
    assert_eq!(remote.patch_count(), 1);
    assert_eq!(remote.event_count(), 1);
    assert_eq!(ws.queue().unwrap().len(), 0);

    let state = remote.state_of("TASK-01").unwrap();
    assert_eq!(state.fields.get("status"), Some(&json!("complete")));
}

#[test]
fn test_queue_survives_process_restart() {
    let tw = TestWorkspace::new().unwrap();
    let remote = ScriptedRemote::new();
    remote.set_online(false);

    {
        let ws = tw.open().unwrap();
        ws.mutate_status(
            &remote,
            &EntityId::new("TASK-09"),
            EntityStatus::InProgress,
            "tester",
        )
        .unwrap();
    }

    // A fresh workspace handle sees the same queued operations.
    let ws = tw.open().unwrap();
    assert_eq!(ws.queue().unwrap().len(), 2);
}

#[test]
fn test_interrupted_drain_does_not_duplicate_events() {
    let tw = TestWorkspace::new().unwrap();
    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    remote.set_online(false);
    ws.mutate_status(
        &remote,
        &EntityId::new("TASK-01"),
        EntityStatus::Complete,
        "tester",
    )
    .unwrap();
    remote.set_online(true);

    // Two pushes in a row: the second finds an empty queue, and even a
    // replayed append would be deduplicated by its idempotency key.
    ws.push(&remote, &SyncScope::All).unwrap();
    ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(remote.event_count(), 1);
    assert_eq!(remote.patch_count(), 1);
}

#[test]
fn test_push_defers_when_remote_is_down() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# One\n\nFirst.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    remote.set_online(false);

    let report = ws.push(&remote, &SyncScope::All).unwrap();
    assert!(!report.is_clean());

    // Nothing was recorded as pushed, so recovery retries everything.
    remote.set_online(true);
    let retry = ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(retry.pushed.len(), 1);
    assert_eq!(remote.upsert_count(), 1);
}
