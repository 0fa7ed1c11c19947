//! Isolation and propagation-visibility properties

use crate::common::*;
use lamina::{Error, FetchRequest, RecordId, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use tempfile::TempDir;

/// Changes are invisible to the opening thread until the completion fires,
/// and visible immediately afterwards (propagation-before-completion).
#[test]
fn propagation_completes_before_completion_fires() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    // Hold the worker on a first task until we have sampled the view
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    store
        .submit(move |_| {
            gate_rx.recv().unwrap();
            Ok(())
        })
        .unwrap();

    store
        .submit(|scope| scope.insert(&events(), event("a", "Standup")))
        .unwrap();

    // The insert is queued behind the gated task: nothing visible yet
    assert!(store.fetch(&FetchRequest::new(events())).unwrap().is_empty());

    gate_tx.send(()).unwrap();
    store.drain();

    let records = store.fetch(&FetchRequest::new(events())).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), &RecordId::new("a"));
}

/// A mutation reads its own staged changes before they are committed.
#[test]
fn mutation_sees_its_own_writes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let observed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&observed);
    store
        .submit(move |scope| {
            scope.insert(&events(), event("a", "Standup"))?;
            let visible = scope.fetch(&FetchRequest::new(events()))?;
            flag.store(
                visible.len() == 1 && !scope.is_entity_empty(&events())?,
                Ordering::SeqCst,
            );
            Ok(())
        })
        .unwrap();
    store.drain();

    assert!(observed.load(Ordering::SeqCst));
}

/// Updating an existing record through a second mutation replaces it,
/// rather than duplicating it.
#[test]
fn second_mutation_replaces_record() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store
        .submit(|scope| scope.insert(&events(), event("a", "Standup")))
        .unwrap();
    store
        .submit(|scope| scope.insert(&events(), event("a", "Retro")))
        .unwrap();
    store.drain();

    let records = store.fetch(&FetchRequest::new(events())).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("title"),
        Some(&Value::String("Retro".to_string()))
    );
}

/// Delete staged and committed through the worker removes the record from
/// every later view.
#[test]
fn delete_propagates_to_reader() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store
        .submit(|scope| scope.insert(&events(), event("a", "Standup")))
        .unwrap();
    store.drain();
    assert_eq!(store.fetch(&FetchRequest::new(events())).unwrap().len(), 1);

    store
        .submit(|scope| scope.delete(&events(), &RecordId::new("a")))
        .unwrap();
    store.drain();
    assert!(store.fetch(&FetchRequest::new(events())).unwrap().is_empty());
    assert!(store.is_entity_empty(&events()).unwrap());
}

/// A failed mutation fires no completion, poisons the store (surface
/// policy), and leaves the durable state untouched.
#[test]
fn failed_mutation_commits_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let completed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&completed);
    store
        .submit_with_completion(
            |scope| {
                scope.insert(&events(), event("a", "Standup"))?;
                // Unknown attribute: staging fails after the first insert
                scope.insert(
                    &events(),
                    event("b", "Review").with("color", Value::String("red".to_string())),
                )
            },
            move || flag.store(true, Ordering::SeqCst),
        )
        .unwrap();
    store.drain();

    assert!(!completed.load(Ordering::SeqCst));
    assert!(matches!(store.take_fault(), Some(Error::UnknownAttribute { .. })));
    assert!(matches!(
        store.fetch(&FetchRequest::new(events())),
        Err(Error::Poisoned)
    ));

    // The durable file was never touched by the failed cycle
    drop(store);
    let reopened = open_store(&dir);
    assert!(reopened.is_entity_empty(&events()).unwrap());
}
