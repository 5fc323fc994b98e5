use crate::harness::{ScriptedRemote, TestWorkspace};
use tether_core::SyncScope;

#[test]
fn test_one_bad_entity_does_not_block_the_batch() {
    let tw = TestWorkspace::new().unwrap();
    for i in 1..=5 {
        tw.write_task(
            &format!("task-{:02}", i),
            &format!("# Task {}\n\nWork item {}.", i, i),
        )
        .unwrap();
    }

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    remote.reject_entity("TASK-03");

    let report = ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(report.pushed.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.as_str(), "TASK-03");

    // Only the failed entity is retried next time.
    let retry = ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(retry.skipped, 4);
    assert_eq!(retry.failed.len(), 1);
    assert_eq!(remote.upsert_count(), 4);
}

#[test]
fn test_failed_entity_syncs_once_fixed() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# One\n\nFirst.").unwrap();
    tw.write_task("task-02", "# Two\n\nSecond.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    remote.reject_entity("TASK-02");
    ws.push(&remote, &SyncScope::All).unwrap();

    let healthy = ScriptedRemote::new();
    let report = ws.push(&healthy, &SyncScope::All).unwrap();
    assert_eq!(report.pushed.len(), 1);
    assert_eq!(report.pushed[0].as_str(), "TASK-02");
}
