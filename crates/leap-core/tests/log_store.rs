// crates/leap-core/tests/log_store.rs
// ============================================================================
// Module: Call Log Store Tests
// Description: Pagination, filtering, and cascade rules of the in-memory store.
// Purpose: Pin the query contract every store backend must honor.
// ============================================================================

//! ## Overview
//! Exercises cursor pagination in both orders, limit clamping, filter
//! combinations, cascade deletes, and option idempotence.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use leap_core::CallLogStore;
use leap_core::InMemoryExperimentStore;
use leap_core::LogOrder;
use leap_core::LogQuery;
use leap_core::NewCallLog;
use leap_core::Student;
use leap_core::StoreError;
use leap_core::StudentId;
use leap_core::StudentRegistry;
use leap_core::Timestamp;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn record(student: &str, func: &str, trial: Option<&str>, args: Vec<Value>) -> NewCallLog {
    NewCallLog {
        student_id: student.to_string(),
        experiment: "default".to_string(),
        func_name: func.to_string(),
        args,
        result: Some(json!(1)),
        error: None,
        trial: trial.map(str::to_string),
    }
}

fn student(id: &str) -> Student {
    Student::new(StudentId::parse(id).unwrap(), format!("Student {id}"), None)
}

fn page(store: &InMemoryExperimentStore, limit: i64, order: LogOrder, after_id: Option<i64>) -> Vec<i64> {
    store
        .query_logs(&LogQuery {
            limit,
            order,
            after_id,
            ..LogQuery::default()
        })
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect()
}

// ============================================================================
// SECTION: Pagination
// ============================================================================

#[test]
fn five_entries_paginate_latest_without_overlap() {
    let store = InMemoryExperimentStore::new();
    for _ in 0 .. 5 {
        store.append_log(&record("s1", "square", None, vec![json!(1)])).unwrap();
    }
    let first = page(&store, 2, LogOrder::Latest, None);
    assert_eq!(first, vec![5, 4]);
    let second = page(&store, 2, LogOrder::Latest, first.last().copied());
    assert_eq!(second, vec![3, 2]);
    let third = page(&store, 2, LogOrder::Latest, second.last().copied());
    assert_eq!(third, vec![1]);
    assert!(page(&store, 2, LogOrder::Latest, Some(1)).is_empty());
}

#[test]
fn earliest_order_walks_forward() {
    let store = InMemoryExperimentStore::new();
    for _ in 0 .. 4 {
        store.append_log(&record("s1", "square", None, vec![])).unwrap();
    }
    assert_eq!(page(&store, 3, LogOrder::Earliest, None), vec![1, 2, 3]);
    assert_eq!(page(&store, 3, LogOrder::Earliest, Some(3)), vec![4]);
    assert!(page(&store, 3, LogOrder::Earliest, Some(4)).is_empty());
}

#[test]
fn out_of_range_limits_are_clamped() {
    let store = InMemoryExperimentStore::new();
    for _ in 0 .. 3 {
        store.append_log(&record("s1", "f", None, vec![])).unwrap();
    }
    assert_eq!(page(&store, 0, LogOrder::Latest, None).len(), 1);
    assert_eq!(page(&store, -10, LogOrder::Latest, None).len(), 1);
    assert_eq!(page(&store, 1_000_000, LogOrder::Latest, None).len(), 3);
}

#[test]
fn ids_are_never_reused_after_cascade_delete() {
    let store = InMemoryExperimentStore::new();
    store.add_student(&student("gone")).unwrap();
    store.append_log(&record("gone", "f", None, vec![])).unwrap();
    store.append_log(&record("gone", "f", None, vec![])).unwrap();
    assert!(store.delete_student("gone").unwrap());
    let next = store.append_log(&record("s2", "f", None, vec![])).unwrap();
    assert_eq!(next.id, 3);
}

// ============================================================================
// SECTION: Filters
// ============================================================================

#[test]
fn filters_are_anded() {
    let store = InMemoryExperimentStore::new();
    store.append_log(&record("a", "square", Some("t1"), vec![])).unwrap();
    store.append_log(&record("a", "cubic", Some("t1"), vec![])).unwrap();
    store.append_log(&record("b", "square", Some("t1"), vec![])).unwrap();
    store.append_log(&record("a", "square", Some("t2"), vec![])).unwrap();
    store.append_log(&record("a", "square", None, vec![])).unwrap();

    let hits = store
        .query_logs(&LogQuery {
            student_id: Some("a".to_string()),
            func_name: Some("square".to_string()),
            trial: Some("t1".to_string()),
            ..LogQuery::default()
        })
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 1);
}

#[test]
fn time_bounds_are_inclusive() {
    let store = InMemoryExperimentStore::new();
    let entry = store.append_log(&record("a", "f", None, vec![])).unwrap();
    let exact = LogQuery {
        start: Some(entry.ts),
        end: Some(entry.ts),
        ..LogQuery::default()
    };
    assert_eq!(store.query_logs(&exact).unwrap().len(), 1);
    let later = LogQuery {
        start: Some(Timestamp::from_unix_micros(entry.ts.unix_micros() + 1)),
        ..LogQuery::default()
    };
    assert!(store.query_logs(&later).unwrap().is_empty());
}

#[test]
fn payloads_round_trip_unchanged() {
    let store = InMemoryExperimentStore::new();
    let args = vec![json!(null), json!(true), json!(-3), json!(2.5), json!("s"), json!({"k": [1, {"z": null}]})];
    let mut new = record("a", "f", None, args.clone());
    new.result = Some(json!({"nested": [1, 2, {"deep": "yes"}]}));
    store.append_log(&new).unwrap();
    let entry = &store.query_logs(&LogQuery::default()).unwrap()[0];
    assert_eq!(entry.args, Value::Array(args));
    assert_eq!(entry.result, json!({"nested": [1, 2, {"deep": "yes"}]}));
}

// ============================================================================
// SECTION: Students
// ============================================================================

#[test]
fn duplicate_student_is_rejected() {
    let store = InMemoryExperimentStore::new();
    store.add_student(&student("s1")).unwrap();
    let err = store.add_student(&student("s1")).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
    assert_eq!(store.count_students().unwrap(), 1);
}

#[test]
fn delete_cascades_only_that_students_logs() {
    let store = InMemoryExperimentStore::new();
    store.add_student(&student("a")).unwrap();
    store.add_student(&student("b")).unwrap();
    for _ in 0 .. 3 {
        store.append_log(&record("a", "f", None, vec![])).unwrap();
        store.append_log(&record("b", "f", None, vec![])).unwrap();
    }
    assert!(store.delete_student("a").unwrap());
    assert!(!store.delete_student("a").unwrap());
    let remaining = store.query_logs(&LogQuery::default()).unwrap();
    assert_eq!(remaining.len(), 3);
    assert!(remaining.iter().all(|entry| entry.student_id == "b"));
    assert!(!store.is_registered("a").unwrap());
    assert!(store.is_registered("b").unwrap());
}

#[test]
fn options_are_sorted_and_idempotent() {
    let store = InMemoryExperimentStore::new();
    store.add_student(&student("zed")).unwrap();
    store.add_student(&student("amy")).unwrap();
    store.append_log(&record("amy", "f", Some("run-b"), vec![])).unwrap();
    store.append_log(&record("zed", "f", Some("run-a"), vec![])).unwrap();
    store.append_log(&record("zed", "f", Some("run-a"), vec![])).unwrap();
    store.append_log(&record("zed", "f", None, vec![])).unwrap();

    let first = store.log_options().unwrap();
    assert_eq!(first.students, vec!["amy", "zed"]);
    assert_eq!(first.trials, vec!["run-a", "run-b"]);
    assert_eq!(first.log_count, 4);
    assert_eq!(store.log_options().unwrap(), first);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn latest_pages_partition_all_ids(total in 0usize .. 40, size in 1i64 .. 8) {
        let store = InMemoryExperimentStore::new();
        for _ in 0 .. total {
            store.append_log(&record("p", "f", None, vec![])).unwrap();
        }
        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let ids = page(&store, size, LogOrder::Latest, cursor);
            prop_assert!(ids.len() as i64 <= size);
            if let Some(c) = cursor {
                prop_assert!(ids.iter().all(|id| *id < c));
            }
            prop_assert!(ids.windows(2).all(|pair| pair[0] > pair[1]));
            let Some(last) = ids.last().copied() else { break };
            seen.extend(ids);
            cursor = Some(last);
        }
        let expected: Vec<i64> = (1 ..= total as i64).rev().collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn earliest_pages_are_strictly_after_cursor(total in 1usize .. 30, cursor in 0i64 .. 35, size in 1i64 .. 10) {
        let store = InMemoryExperimentStore::new();
        for _ in 0 .. total {
            store.append_log(&record("p", "f", None, vec![])).unwrap();
        }
        let ids = page(&store, size, LogOrder::Earliest, Some(cursor));
        prop_assert!(ids.len() as i64 <= size);
        prop_assert!(ids.iter().all(|id| *id > cursor));
        prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn requested_limit_bounds_page_size(limit in -50i64 .. 20_000) {
        let store = InMemoryExperimentStore::new();
        for _ in 0 .. 12 {
            store.append_log(&record("p", "f", None, vec![])).unwrap();
        }
        let len = page(&store, limit, LogOrder::Latest, None).len() as i64;
        let effective = limit.clamp(1, 10_000);
        prop_assert_eq!(len, effective.min(12));
    }
}
