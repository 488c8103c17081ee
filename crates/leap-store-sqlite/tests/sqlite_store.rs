// crates/leap-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Experiment Store Tests
// Description: Durability, id allocation, cascades, and defensive decoding.
// Purpose: Validate the SQLite backend against the shared store contract.
// ============================================================================

//! ## Overview
//! Integration tests for the `SQLite` experiment store:
//! - Persistence across reopen and never-reused log ids
//! - Cascade deletes and cursor pagination
//! - Lossy decoding of tampered payload columns
//! - Schema version validation and path safety

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::sync::Arc;
use std::thread;

use leap_core::CallLogStore;
use leap_core::ExperimentName;
use leap_core::LogOrder;
use leap_core::LogQuery;
use leap_core::NewCallLog;
use leap_core::StoreError;
use leap_core::StoreOpener;
use leap_core::Student;
use leap_core::StudentId;
use leap_core::StudentRegistry;
use leap_store_sqlite::SqliteExperimentStore;
use leap_store_sqlite::SqliteStoreConfig;
use leap_store_sqlite::SqliteStoreError;
use leap_store_sqlite::SqliteStoreOpener;
use proptest::prelude::*;
use rusqlite::Connection;
use rusqlite::params;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(path: &Path) -> SqliteExperimentStore {
    SqliteExperimentStore::new(SqliteStoreConfig::new(path)).unwrap()
}

fn record(student: &str, func: &str, args: Vec<Value>) -> NewCallLog {
    NewCallLog {
        student_id: student.to_string(),
        experiment: "default".to_string(),
        func_name: func.to_string(),
        args,
        result: Some(json!(4)),
        error: None,
        trial: None,
    }
}

fn student(id: &str) -> Student {
    Student::new(StudentId::parse(id).unwrap(), "Student", Some(format!("{id}@example.edu")))
}

fn ids(entries: &[leap_core::CallLogEntry]) -> Vec<i64> {
    entries.iter().map(|entry| entry.id).collect()
}

// ============================================================================
// SECTION: Durability
// ============================================================================

#[test]
fn students_and_logs_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").join("experiment.db");
    {
        let store = open(&path);
        store.add_student(&student("s001")).unwrap();
        store.append_log(&record("s001", "square", vec![json!(2)])).unwrap();
    }
    let store = open(&path);
    let students = store.list_students().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].email.as_deref(), Some("s001@example.edu"));
    let logs = store.query_logs(&LogQuery::default()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].args, json!([2]));
    assert_eq!(logs[0].result, json!(4));
}

#[test]
fn log_ids_are_never_reused_after_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.db");
    let store = open(&path);
    store.add_student(&student("gone")).unwrap();
    for _ in 0 .. 3 {
        store.append_log(&record("gone", "f", vec![])).unwrap();
    }
    assert!(store.delete_student("gone").unwrap());
    drop(store);
    let store = open(&path);
    let next = store.append_log(&record("s2", "f", vec![])).unwrap();
    assert_eq!(next.id, 4);
}

#[test]
fn duplicate_student_maps_to_already_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("experiment.db"));
    store.add_student(&student("s001")).unwrap();
    let err = store.add_student(&student("s001")).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
    assert_eq!(store.count_students().unwrap(), 1);
}

#[test]
fn delete_cascades_and_reports_absence() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("experiment.db"));
    store.add_student(&student("a")).unwrap();
    store.add_student(&student("b")).unwrap();
    store.append_log(&record("a", "f", vec![])).unwrap();
    store.append_log(&record("b", "f", vec![])).unwrap();
    assert!(store.delete_student("a").unwrap());
    assert!(!store.delete_student("a").unwrap());
    assert!(!store.is_registered("a").unwrap());
    let remaining = store.query_logs(&LogQuery::default()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].student_id, "b");
}

// ============================================================================
// SECTION: Queries
// ============================================================================

#[test]
fn cursor_pagination_in_both_orders() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("experiment.db"));
    for _ in 0 .. 5 {
        store.append_log(&record("s1", "square", vec![])).unwrap();
    }
    let latest = |after_id| {
        store
            .query_logs(&LogQuery {
                limit: 2,
                after_id,
                ..LogQuery::default()
            })
            .unwrap()
    };
    assert_eq!(ids(&latest(None)), vec![5, 4]);
    assert_eq!(ids(&latest(Some(4))), vec![3, 2]);
    assert_eq!(ids(&latest(Some(2))), vec![1]);

    let earliest = store
        .query_logs(&LogQuery {
            limit: 3,
            order: LogOrder::Earliest,
            after_id: Some(2),
            ..LogQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&earliest), vec![3, 4, 5]);
}

#[test]
fn filters_and_options_match_contents() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("experiment.db"));
    store.add_student(&student("zed")).unwrap();
    store.add_student(&student("amy")).unwrap();
    let mut first = record("amy", "square", vec![]);
    first.trial = Some("run-b".to_string());
    store.append_log(&first).unwrap();
    let mut second = record("zed", "cubic", vec![]);
    second.trial = Some("run-a".to_string());
    store.append_log(&second).unwrap();
    store.append_log(&record("zed", "square", vec![])).unwrap();

    let hits = store
        .query_logs(&LogQuery {
            student_id: Some("zed".to_string()),
            func_name: Some("square".to_string()),
            ..LogQuery::default()
        })
        .unwrap();
    assert_eq!(ids(&hits), vec![3]);

    let options = store.log_options().unwrap();
    assert_eq!(options.students, vec!["amy", "zed"]);
    assert_eq!(options.trials, vec!["run-a", "run-b"]);
    assert_eq!(options.log_count, 3);
    assert_eq!(store.log_options().unwrap(), options);
}

#[test]
fn failed_calls_store_null_result_and_error_text() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("experiment.db"));
    let mut failed = record("s1", "boom", vec![json!({"k": [1, null]})]);
    failed.result = None;
    failed.error = Some("ValueError: boom".to_string());
    store.append_log(&failed).unwrap();
    let entry = &store.query_logs(&LogQuery::default()).unwrap()[0];
    assert_eq!(entry.result, Value::Null);
    assert_eq!(entry.error.as_deref(), Some("ValueError: boom"));
    assert_eq!(entry.args, json!([{"k": [1, null]}]));
}

#[test]
fn tampered_payloads_fall_back_to_raw_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.db");
    let store = open(&path);
    drop(store);
    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO logs (ts_us, student_id, experiment, trial, func_name, args_json, \
         result_json, error) VALUES (1, 's1', 'default', NULL, 'f', ?1, ?2, NULL)",
        params!["{not json", vec![0xff_u8, 0x61]],
    )
    .unwrap();
    drop(conn);

    let store = open(&path);
    let entry = &store.query_logs(&LogQuery::default()).unwrap()[0];
    assert_eq!(entry.args, json!("{not json"));
    assert_eq!(entry.result, json!("\u{fffd}a"));
}

#[test]
fn concurrent_appends_allocate_unique_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&dir.path().join("experiment.db")));
    let mut handles = Vec::new();
    for worker in 0 .. 4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            (0 .. 10)
                .map(|_| store.append_log(&record(&format!("w{worker}"), "f", vec![])).unwrap().id)
                .collect::<Vec<_>>()
        }));
    }
    let mut all: Vec<i64> = handles.into_iter().flat_map(|handle| handle.join().unwrap()).collect();
    all.sort_unstable();
    assert_eq!(all, (1 ..= 40).collect::<Vec<_>>());
}

#[test]
fn concurrent_appends_keep_timestamps_in_id_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&dir.path().join("experiment.db")));
    let mut handles = Vec::new();
    for worker in 0 .. 8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            (0 .. 25)
                .map(|_| store.append_log(&record(&format!("w{worker}"), "f", vec![])).unwrap())
                .collect::<Vec<_>>()
        }));
    }
    let mut appended: Vec<_> =
        handles.into_iter().flat_map(|handle| handle.join().unwrap()).collect();
    appended.sort_by_key(|entry| entry.id);
    assert!(appended.windows(2).all(|pair| pair[0].ts <= pair[1].ts));

    let stored = store
        .query_logs(&LogQuery {
            limit: 1_000,
            order: LogOrder::Earliest,
            ..LogQuery::default()
        })
        .unwrap();
    assert_eq!(stored.len(), 200);
    assert!(stored.windows(2).all(|pair| pair[0].ts <= pair[1].ts));
    let stored_ts: Vec<_> = stored.iter().map(|entry| entry.ts).collect();
    let appended_ts: Vec<_> = appended.iter().map(|entry| entry.ts).collect();
    assert_eq!(stored_ts, appended_ts);
}

// ============================================================================
// SECTION: Integrity
// ============================================================================

#[test]
fn unknown_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.db");
    drop(open(&path));
    let conn = Connection::open(&path).unwrap();
    conn.execute("UPDATE store_meta SET version = 99", params![]).unwrap();
    drop(conn);
    let err = SqliteExperimentStore::new(SqliteStoreConfig::new(&path)).unwrap_err();
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
    assert!(matches!(StoreError::from(err), StoreError::VersionMismatch(_)));
}

#[test]
fn directory_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = SqliteExperimentStore::new(SqliteStoreConfig::new(dir.path())).unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

#[test]
fn opener_places_database_inside_experiment_dir() {
    let dir = tempfile::tempdir().unwrap();
    let name = ExperimentName::parse("lab").unwrap();
    let store = SqliteStoreOpener::default().open(&name, dir.path()).unwrap();
    store.add_student(&student("s1")).unwrap();
    assert!(dir.path().join("db").join("experiment.db").is_file());
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn json_payloads_round_trip(text in ".{0,32}", number in any::<i64>(), flag in any::<bool>()) {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("experiment.db"));
        let args = vec![json!(text), json!(number), json!({"flag": flag, "list": [number, null]})];
        store.append_log(&record("p", "f", args.clone())).unwrap();
        let entry = &store.query_logs(&LogQuery::default()).unwrap()[0];
        prop_assert_eq!(&entry.args, &Value::Array(args));
    }
}
