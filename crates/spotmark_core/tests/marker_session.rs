use spotmark_core::db::{open_db, open_db_in_memory};
use spotmark_core::{
    Coordinate, KeyValueStorage, KvMarkerStore, MarkerCategory, MarkerKey, MarkerSession,
    MarkerStore, MemoryKeyValueStorage, SessionError, SessionNotice, SqliteKeyValueStorage,
    StoreError, UnavailableMarkerStore, DEFAULT_MARKER_LABEL, MARKERS_STORAGE_KEY,
};
use std::collections::HashSet;
use std::sync::Arc;

type SqliteSession = MarkerSession<KvMarkerStore<SqliteKeyValueStorage>>;

fn new_session() -> SqliteSession {
    let storage = SqliteKeyValueStorage::new(open_db_in_memory().unwrap());
    MarkerSession::initialize(KvMarkerStore::new(storage))
}

fn stored(session: &SqliteSession) -> Vec<spotmark_core::Marker> {
    session.store().load().unwrap()
}

#[test]
fn each_create_adds_one_marker_with_distinct_key() {
    let mut session = new_session();
    for i in 0..25 {
        session
            .create_marker_at(Coordinate::new(60.0 + f64::from(i) * 0.01, 24.9))
            .unwrap();
    }

    assert_eq!(session.len(), 25);
    let keys: HashSet<_> = session.markers().iter().map(|m| m.key.clone()).collect();
    assert_eq!(keys.len(), 25);
    assert_eq!(stored(&session), session.markers().to_vec());
}

#[test]
fn commit_renames_only_the_target_marker() {
    let mut session = new_session();
    let first = session
        .create_marker_at(Coordinate::new(60.1, 24.1))
        .unwrap()
        .key;
    session.commit_edit("Herkkutatti").unwrap();
    let second = session
        .create_marker_at(Coordinate::new(60.2, 24.2))
        .unwrap()
        .key;
    session.cancel_edit();
    let before = session.markers().to_vec();

    session.begin_edit(&first).unwrap();
    let report = session.commit_edit("  Kanttarelli  ").unwrap();

    assert_eq!(report.key, first);
    assert!(report.is_persisted());
    assert_eq!(session.len(), before.len());
    assert_eq!(
        session.marker(&first).unwrap().name.as_deref(),
        Some("Kanttarelli")
    );
    assert_eq!(session.marker(&second), before.iter().find(|m| m.key == second));
    assert_eq!(
        session.marker(&first).unwrap().coordinate,
        Coordinate::new(60.1, 24.1)
    );
    assert!(session.active_edit().is_none());
    assert_eq!(stored(&session), session.markers().to_vec());
}

#[test]
fn blank_commit_fails_and_changes_nothing() {
    let mut session = new_session();
    let key = session
        .create_marker_at(Coordinate::new(60.1, 24.1))
        .unwrap()
        .key;
    session.set_draft_name("draft").unwrap();
    let before = session.markers().to_vec();
    let active_before = session.active_edit().cloned();

    for blank in ["", "   ", "\t\n"] {
        assert_eq!(session.commit_edit(blank).unwrap_err(), SessionError::EmptyName);
    }

    assert_eq!(session.markers(), before.as_slice());
    assert_eq!(session.active_edit().cloned(), active_before);
    assert_eq!(session.active_edit().unwrap().key, key);
}

#[test]
fn commit_without_active_edit_fails() {
    let mut session = new_session();
    assert_eq!(
        session.commit_edit("Kanttarelli").unwrap_err(),
        SessionError::NoActiveEdit
    );
}

#[test]
fn delete_active_removes_exactly_the_edited_marker() {
    let mut session = new_session();
    let keep = session
        .create_marker_at(Coordinate::new(60.1, 24.1))
        .unwrap()
        .key;
    let doomed = session
        .create_marker_at(Coordinate::new(60.2, 24.2))
        .unwrap()
        .key;
    session.cancel_edit();

    session.begin_edit(&doomed).unwrap();
    let report = session.delete_active().unwrap();

    assert_eq!(report.key, doomed);
    assert_eq!(session.len(), 1);
    assert!(session.marker(&keep).is_some());
    assert!(session.marker(&doomed).is_none());
    assert!(session.active_edit().is_none());
    assert_eq!(stored(&session).len(), 1);
}

#[test]
fn delete_without_active_edit_fails_and_keeps_collection() {
    let mut session = new_session();
    session.create_marker_at(Coordinate::new(60.1, 24.1)).unwrap();
    session.cancel_edit();

    assert_eq!(session.delete_active().unwrap_err(), SessionError::NoActiveEdit);
    assert_eq!(session.len(), 1);
}

#[test]
fn cancel_never_alters_collection() {
    let mut session = new_session();
    session.cancel_edit();
    assert!(session.is_empty());

    let key = session
        .create_marker_at(Coordinate::new(60.1, 24.1))
        .unwrap()
        .key;
    session.set_draft_name("unsaved").unwrap();
    let before = session.markers().to_vec();
    session.cancel_edit();

    assert_eq!(session.markers(), before.as_slice());
    assert!(session.marker(&key).unwrap().name.is_none());
    assert!(session.active_edit().is_none());
}

#[test]
fn begin_edit_on_missing_key_fails_and_keeps_slot() {
    let mut session = new_session();
    let missing = MarkerKey::from("no-such-marker");

    assert_eq!(
        session.begin_edit(&missing).unwrap_err(),
        SessionError::NotFound(missing.clone())
    );
    assert!(session.active_edit().is_none());

    let key = session
        .create_marker_at(Coordinate::new(60.1, 24.1))
        .unwrap()
        .key;
    assert!(session.begin_edit(&missing).is_err());
    assert_eq!(session.active_edit().unwrap().key, key);
}

#[test]
fn begin_edit_starts_from_current_name_and_discards_previous_draft() {
    let mut session = new_session();
    let named = session
        .create_marker_at(Coordinate::new(60.1, 24.1))
        .unwrap()
        .key;
    session.commit_edit("Mustatorvisieni").unwrap();
    let other = session
        .create_marker_at(Coordinate::new(60.2, 24.2))
        .unwrap()
        .key;
    session.set_draft_name("half typed").unwrap();

    let active = session.begin_edit(&named).unwrap();
    assert_eq!(active.draft_name, "Mustatorvisieni");
    assert!(session.marker(&other).unwrap().name.is_none());

    session.begin_edit(&other).unwrap();
    assert_eq!(session.active_edit().unwrap().draft_name, "");
}

#[test]
fn naming_scenario_clears_slot_after_commit() {
    let mut session = new_session();
    let key = session
        .create_marker_at(Coordinate::new(60.17, 24.94))
        .unwrap()
        .key;
    assert_eq!(session.len(), 1);
    assert!(session.markers()[0].name.is_none());

    session.begin_edit(&key).unwrap();
    session.commit_edit("Kanttarelli").unwrap();

    assert_eq!(
        session.marker(&key).unwrap().name.as_deref(),
        Some("Kanttarelli")
    );
    assert_eq!(session.delete_active().unwrap_err(), SessionError::NoActiveEdit);
    assert_eq!(session.len(), 1);
}

#[test]
fn two_creates_persist_two_unnamed_markers() {
    let mut session = new_session();
    session.create_marker_at(Coordinate::new(60.1, 24.1)).unwrap();
    session.create_marker_at(Coordinate::new(60.2, 24.2)).unwrap();

    let persisted = stored(&session);
    assert_eq!(persisted.len(), 2);
    assert!(persisted.iter().all(|marker| marker.name.is_none()));
}

#[test]
fn marker_views_use_default_label_and_category_icons() {
    let mut session = new_session();
    session.create_marker_at(Coordinate::new(60.1, 24.1)).unwrap();
    session.create_marker_at(Coordinate::new(60.2, 24.2)).unwrap();
    session.commit_edit("suppilovahvero").unwrap();

    let views = session.marker_views();
    assert_eq!(views[0].label, DEFAULT_MARKER_LABEL);
    assert_eq!(views[0].category, None);
    assert_eq!(views[1].label, "suppilovahvero");
    assert_eq!(views[1].category, Some(MarkerCategory::FunnelChanterelle));
}

#[test]
fn markers_survive_app_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("markers.db");

    let key = {
        let storage = SqliteKeyValueStorage::new(open_db(&path).unwrap());
        let mut session = MarkerSession::initialize(KvMarkerStore::new(storage));
        let key = session
            .create_marker_at(Coordinate::new(60.17, 24.94))
            .unwrap()
            .key;
        session.commit_edit("Kanttarelli").unwrap();
        key
    };

    let storage = SqliteKeyValueStorage::new(open_db(&path).unwrap());
    let mut session = MarkerSession::initialize(KvMarkerStore::new(storage));
    assert!(session.take_notices().is_empty());
    assert_eq!(session.len(), 1);
    assert_eq!(
        session.marker(&key).unwrap().name.as_deref(),
        Some("Kanttarelli")
    );
    assert!(session.active_edit().is_none());
}

#[test]
fn corrupt_storage_starts_empty_with_read_notice() {
    let storage = MemoryKeyValueStorage::new();
    storage.set_item(MARKERS_STORAGE_KEY, "not json").unwrap();

    let mut session = MarkerSession::initialize(KvMarkerStore::new(&storage));
    assert!(session.is_empty());

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], SessionNotice::StorageReadFailure(_)));
    assert!(session.take_notices().is_empty());

    session.create_marker_at(Coordinate::new(60.1, 24.1)).unwrap();
    let repaired = KvMarkerStore::new(&storage).load().unwrap();
    assert_eq!(repaired.len(), 1);
}

#[test]
fn write_failure_keeps_memory_and_queues_notice() {
    let mut session = new_session();
    session
        .store()
        .storage()
        .connection()
        .execute_batch("PRAGMA query_only = ON;")
        .unwrap();

    let report = session
        .create_marker_at(Coordinate::new(60.1, 24.1))
        .unwrap();
    assert!(!report.is_persisted());
    assert_eq!(session.len(), 1);
    assert_eq!(session.active_edit().unwrap().key, report.key);

    let persist_error = report.persist_error.expect("failed save should be reported");
    assert!(matches!(*persist_error, StoreError::Write(_)));

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    match &notices[0] {
        SessionNotice::StorageWriteFailure(err) => assert!(Arc::ptr_eq(err, &persist_error)),
        other => panic!("unexpected notice: {other}"),
    }
    assert_eq!(notices[0].user_message(), "Changes could not be saved.");

    session
        .store()
        .storage()
        .connection()
        .execute_batch("PRAGMA query_only = OFF;")
        .unwrap();
    let report = session.commit_edit("Kanttarelli").unwrap();
    assert!(report.persist_error.is_none());
    assert_eq!(stored(&session), session.markers().to_vec());
}

#[test]
fn session_without_storage_runs_from_memory() {
    let store: Box<dyn MarkerStore + Send> = Box::new(UnavailableMarkerStore::new("no database"));
    let mut session = MarkerSession::initialize(store);

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], SessionNotice::StorageReadFailure(_)));
    assert!(notices[0].error().is_unavailable());

    let report = session
        .create_marker_at(Coordinate::new(60.17, 24.94))
        .unwrap();
    assert!(!report.is_persisted());
    session.commit_edit("Suppilovahvero").unwrap();

    assert_eq!(session.len(), 1);
    assert_eq!(session.markers()[0].name.as_deref(), Some("Suppilovahvero"));
    let notices = session.take_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices
        .iter()
        .all(|notice| matches!(notice, SessionNotice::StorageWriteFailure(_))));
}
