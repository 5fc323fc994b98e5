use crate::harness::{ScriptedRemote, TestWorkspace};
use tether_core::{EntityId, EventCategory, SyncScope, TetherError};

#[test]
fn test_session_resume_replays_missed_events() {
    let tw = TestWorkspace::new().unwrap();
    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    remote.seed_event("TASK-01", "kickoff");
    ws.pull(&remote, &SyncScope::All).unwrap();

    let store = ws.session_store();
    store.start(Some("main"), &ws.event_cache(), ws.now()).unwrap();

    // Events arrive while the session is away.
    remote.seed_event("TASK-01", "design agreed");
    remote.seed_event("TASK-02", "blocked on infra");
    ws.pull(&remote, &SyncScope::All).unwrap();

    let missed = store.resume(&ws.event_cache(), ws.now()).unwrap();
    let descriptions: Vec<_> = missed.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, vec!["design agreed", "blocked on infra"]);

    // The read head moved past them.
    assert!(store.resume(&ws.event_cache(), ws.now()).unwrap().is_empty());
}

#[test]
fn test_logged_event_advances_active_session() {
    let tw = TestWorkspace::new().unwrap();
    let ws = tw.open().unwrap();
    let remote = ScriptedRemote::new();

    let store = ws.session_store();
    store.start(Some("main"), &ws.event_cache(), ws.now()).unwrap();

    ws.log_event(
        &remote,
        &EntityId::new("TASK-01"),
        EventCategory::Handoff,
        "handing over to dana",
        "tester",
    )
    .unwrap();

    // The session authored this event, so resume has nothing to replay.
    assert!(store.resume(&ws.event_cache(), ws.now()).unwrap().is_empty());
    assert_eq!(remote.event_count(), 1);
}

#[test]
fn test_session_lifecycle_is_exclusive() {
    let tw = TestWorkspace::new().unwrap();
    let ws = tw.open().unwrap();
    let store = ws.session_store();

    store.start(Some("main"), &ws.event_cache(), ws.now()).unwrap();
    let second = store.start(Some("other"), &ws.event_cache(), ws.now());
    assert!(matches!(second, Err(TetherError::SessionAlreadyActive(_))));

    store.end(ws.now()).unwrap();
    assert!(store.start(Some("other"), &ws.event_cache(), ws.now()).is_ok());
}
