use crate::harness::{ScriptedRemote, TestWorkspace};
use tether_core::SyncScope;

#[test]
fn test_push_is_idempotent() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# Fix login\n\nUsers cannot log in.")
        .unwrap();
    tw.write_task("task-02", "# Add logout\n\nNo way to log out.")
        .unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    let first = ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(first.pushed.len(), 2);
    assert_eq!(remote.upsert_count(), 2);

    // Nothing changed locally, so the second push performs zero writes.
    let second = ws.push(&remote, &SyncScope::All).unwrap();
    assert!(second.pushed.is_empty());
    assert_eq!(second.skipped, 2);
    assert_eq!(remote.upsert_count(), 2);
}

#[test]
fn test_edit_resyncs_only_the_edited_entity() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# One\n\nFirst.").unwrap();
    tw.write_task("task-02", "# Two\n\nSecond.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    ws.push(&remote, &SyncScope::All).unwrap();

    tw.write_task("task-02", "# Two\n\nSecond, revised.").unwrap();
    let report = ws.push(&remote, &SyncScope::All).unwrap();

    assert_eq!(report.pushed.len(), 1);
    assert_eq!(report.pushed[0].as_str(), "TASK-02");
    assert_eq!(remote.upsert_count(), 3);
}

#[test]
fn test_local_delete_archives_remotely() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# Short lived\n\nGone soon.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();
    ws.push(&remote, &SyncScope::All).unwrap();

    tw.delete_doc("tasks/task-01.md").unwrap();
    let report = ws.push(&remote, &SyncScope::All).unwrap();

    // Deletion never removes remote data; the entity is archived.
    assert_eq!(report.pushed.len(), 1);
    let patches = remote.patches_for("TASK-01");
    assert_eq!(patches.len(), 1);
    assert_eq!(
        patches[0].fields().get("status").and_then(|v| v.as_str()),
        Some("archived")
    );

    // The tombstoned record is dropped, so a re-push stays quiet.
    let again = ws.push(&remote, &SyncScope::All).unwrap();
    assert!(again.pushed.is_empty());
    assert_eq!(remote.patch_count(), 1);
}

#[test]
fn test_charter_file_is_tracked_like_any_entity() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_doc("charter.md", "# Project Charter\n\nWhat and why.")
        .unwrap();
    tw.write_task("task-01", "# One\n\nFirst.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    let report = ws.push(&remote, &SyncScope::All).unwrap();
    assert_eq!(report.pushed.len(), 2);
    assert!(remote
        .upserted_ids()
        .iter()
        .any(|id| id.as_str() == "CHARTER"));

    // The charter counts toward idempotence like everything else.
    let second = ws.push(&remote, &SyncScope::All).unwrap();
    assert!(second.pushed.is_empty());
    assert_eq!(second.skipped, 2);
}

#[test]
fn test_scope_limits_push_to_one_kind() {
    let tw = TestWorkspace::new().unwrap();
    tw.write_task("task-01", "# A task\n\nWork.").unwrap();
    tw.write_epic("epic-01", "# An epic\n\nBig work.").unwrap();

    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    let report = ws.push(&remote, &SyncScope::parse("epics")).unwrap();
    assert_eq!(report.pushed.len(), 1);
    assert_eq!(remote.upserted_ids()[0].as_str(), "EPIC-01");
}
