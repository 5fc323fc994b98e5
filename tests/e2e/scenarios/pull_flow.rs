use crate::harness::{ScriptedRemote, TestWorkspace};
use serde_json::json;
use tether_core::{EntityId, SyncScope};

#[test]
fn test_pull_caches_remote_state_without_touching_content() {
    let tw = TestWorkspace::new().unwrap();
    let body = "# Fix login\n\nUsers cannot log in.";
    tw.write_task("task-01", body).unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    ws.push(&remote, &SyncScope::All).unwrap();

    remote.seed_state(
        "TASK-01",
        4,
        &[("status", json!("in_progress")), ("assignee", json!("dana"))],
    );

    let report = ws.pull(&remote, &SyncScope::All).unwrap();
    assert_eq!(report.updated.len(), 1);

    // State landed in the cache, and the markdown file is untouched.
    let cache = ws.state_cache().unwrap();
    let cached = cache.get(&EntityId::new("TASK-01")).unwrap();
    assert_eq!(cached.version, 4);
    assert_eq!(cached.fields.get("assignee"), Some(&json!("dana")));
    assert_eq!(tw.read_doc("tasks/task-01.md").unwrap(), body);

    // The write-back did not register as a local edit.
    let push_after = ws.push(&remote, &SyncScope::All).unwrap();
    assert!(push_after.pushed.is_empty());
}

#[test]
fn test_pull_is_idempotent_per_version() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# One\n\nFirst.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    ws.push(&remote, &SyncScope::All).unwrap();
    remote.seed_state("TASK-01", 2, &[("status", json!("open"))]);

    let first = ws.pull(&remote, &SyncScope::All).unwrap();
    assert_eq!(first.updated.len(), 1);

    let second = ws.pull(&remote, &SyncScope::All).unwrap();
    assert!(second.updated.is_empty());
    assert_eq!(second.unchanged, 1);
}

#[test]
fn test_remote_wins_divergent_state() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# One\n\nFirst.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    ws.push(&remote, &SyncScope::All).unwrap();

    remote.seed_state("TASK-01", 1, &[("status", json!("open"))]);
    ws.pull(&remote, &SyncScope::All).unwrap();

    // A local mutation that never reached the remote diverges from a
    // newer remote write. Pull reports the divergence and the remote wins.
    remote.set_online(false);
    ws.mutate_status(
        &remote,
        &EntityId::new("TASK-01"),
        tether_core::EntityStatus::Complete,
        "tester",
    )
    .unwrap();
    remote.set_online(true);
    remote.seed_state("TASK-01", 2, &[("status", json!("paused"))]);

    let report = ws.pull(&remote, &SyncScope::All).unwrap();
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].field, "status");
    assert_eq!(report.conflicts[0].remote, json!("paused"));

    let cache = ws.state_cache().unwrap();
    let cached = cache.get(&EntityId::new("TASK-01")).unwrap();
    assert_eq!(cached.fields.get("status"), Some(&json!("paused")));
}

#[test]
fn test_pull_appends_remote_events_to_cache() {
    let tw = TestWorkspace::new().unwrap();
    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    remote.seed_event("TASK-01", "started work");
    remote.seed_event("TASK-01", "blocked on review");

    let report = ws.pull(&remote, &SyncScope::All).unwrap();
    assert_eq!(report.events_fetched, 2);

    let cached = ws.event_cache().read_since(None).unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[1].description, "blocked on review");

    // Cursor advanced; re-pulling fetches nothing new.
    let again = ws.pull(&remote, &SyncScope::All).unwrap();
    assert_eq!(again.events_fetched, 0);
}
