//! Bootstrap and entity-lifecycle scenarios

use crate::common::*;
use lamina::{Error, FetchRequest, OpenOptions, Predicate, RecordId, Store, Value};
use std::sync::mpsc;
use tempfile::TempDir;

/// The canonical scenario: open → insert {id: "a", title: "Standup"} →
/// on completion, fetch on the opening thread sees exactly that record.
#[test]
fn insert_standup_then_fetch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let (tx, rx) = mpsc::channel();
    store
        .submit_with_completion(
            |scope| scope.insert(&events(), event("a", "Standup")),
            move || tx.send(()).unwrap(),
        )
        .unwrap();
    rx.recv().unwrap();

    let records = store.fetch(&FetchRequest::new(events())).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), &RecordId::new("a"));
    assert_eq!(
        records[0].get("title"),
        Some(&Value::String("Standup".to_string()))
    );
}

#[test]
fn entity_is_empty_before_any_write() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    assert!(store.is_entity_empty(&events()).unwrap());
}

#[test]
fn clean_entity_then_empty() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    for i in 0..5 {
        let record = event(&format!("id-{i}"), "Standup");
        store
            .submit(move |scope| scope.insert(&events(), record))
            .unwrap();
    }
    store.drain();
    assert!(!store.is_entity_empty(&events()).unwrap());

    store.clean_entity(&events()).unwrap();
    store.drain();
    assert!(store.is_entity_empty(&events()).unwrap());
}

#[test]
fn defaults_fill_on_staging() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store
        .submit(|scope| scope.insert(&events(), event("a", "Standup")))
        .unwrap();
    store.drain();

    let records = store.fetch(&FetchRequest::new(events())).unwrap();
    assert_eq!(records[0].get("duration_secs"), Some(&Value::I64(3600)));
    assert_eq!(records[0].get("location"), Some(&Value::Null));
    assert!(matches!(records[0].get("starts_at"), Some(Value::Timestamp(_))));
}

#[test]
fn predicate_sort_and_limit() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    for (id, title, duration) in [
        ("a", "Standup", 900_i64),
        ("b", "Review", 5400),
        ("c", "Planning", 1800),
    ] {
        let record = event(id, title).with("duration_secs", Value::I64(duration));
        store
            .submit(move |scope| scope.insert(&events(), record))
            .unwrap();
    }
    store.drain();

    let long_meetings = store
        .fetch(
            &FetchRequest::new(events())
                .filtered(Predicate::gt("duration_secs", Value::I64(1000)))
                .sorted_by("duration_secs", false),
        )
        .unwrap();
    let ids: Vec<&str> = long_meetings.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);

    let first_two = store
        .fetch(&FetchRequest::new(events()).with_limit(2))
        .unwrap();
    assert_eq!(first_two.len(), 2);
}

#[test]
fn sort_by_start_time() {
    use chrono::{TimeZone, Utc};

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    for (id, hour) in [("late", 15), ("early", 9), ("midday", 12)] {
        let starts = Utc.with_ymd_and_hms(2017, 3, 19, hour, 0, 0).unwrap();
        let record = event(id, "Standup").with("starts_at", Value::Timestamp(starts));
        store
            .submit(move |scope| scope.insert(&events(), record))
            .unwrap();
    }
    store.drain();

    let ordered = store
        .fetch(&FetchRequest::new(events()).sorted_by("starts_at", true))
        .unwrap();
    let ids: Vec<&str> = ordered.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["early", "midday", "late"]);
}

#[test]
fn double_open_joins_existing_instance() {
    let dir = TempDir::new().unwrap();
    let first = open_store(&dir);
    let second = Store::open(OpenOptions::new(dir.path(), schema())).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn schema_file_bootstrap() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(lamina::SCHEMA_FILE_NAME), EVENT_SCHEMA).unwrap();

    let store = Store::open(OpenOptions::with_schema_file(dir.path())).unwrap();
    assert!(store.is_entity_empty(&events()).unwrap());
}

#[test]
fn missing_schema_file_is_bootstrap_fault() {
    let dir = TempDir::new().unwrap();
    let err = Store::open(OpenOptions::with_schema_file(dir.path().join("nowhere"))).unwrap_err();
    assert!(matches!(err, Error::Bootstrap(_)));
    assert!(err.is_unrecoverable());
}
