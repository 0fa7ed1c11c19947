//! Durability across reopen, recovery, and in-place migration

use crate::common::*;
use lamina::{
    EntityKind, Error, FetchRequest, OpenOptions, SchemaDescriptor, Store, Value,
};
use lamina::FaultPolicy;
use tempfile::TempDir;

#[test]
fn committed_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store
            .submit(|scope| scope.insert(&events(), event("a", "Standup")))
            .unwrap();
        store
            .submit(|scope| scope.insert(&events(), event("b", "Review")))
            .unwrap();
        store.drain();
    }

    let store = open_store(&dir);
    let records = store.fetch(&FetchRequest::new(events())).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn generation_advances_once_per_commit_cycle() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let initial = store.stats().generation;

    store
        .submit(|scope| scope.insert(&events(), event("a", "Standup")))
        .unwrap();
    store.drain();
    assert_eq!(store.stats().generation, initial + 1);

    // A no-op mutation commits nothing at any level
    store.submit(|_| Ok(())).unwrap();
    store.drain();
    assert_eq!(store.stats().generation, initial + 1);
}

#[test]
fn corrupted_snapshot_fails_bootstrap() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store
            .submit(|scope| scope.insert(&events(), event("a", "Standup")))
            .unwrap();
        store.drain();
    }

    let snapshot = dir.path().join("lamina.snap");
    let mut bytes = std::fs::read(&snapshot).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&snapshot, &bytes).unwrap();

    let err =
        Store::open(OpenOptions::new(dir.path(), schema()).fault_policy(FaultPolicy::Surface))
            .unwrap_err();
    assert!(matches!(err, Error::Corruption(_)));
    assert!(err.is_unrecoverable());
}

#[test]
fn schema_change_upgrades_in_place() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store
            .submit(|scope| scope.insert(&events(), event("a", "Standup")))
            .unwrap();
        store.drain();
    }

    // Same entity with an attribute dropped and one added with a default
    let upgraded_schema = SchemaDescriptor::from_toml_str(
        r#"
        [[entity]]
        name = "event"

          [[entity.attribute]]
          name = "title"
          type = "string"

          [[entity.attribute]]
          name = "priority"
          type = "int"
          default = 1
        "#,
    )
    .unwrap();

    let store = Store::open(
        OpenOptions::new(dir.path(), upgraded_schema).fault_policy(FaultPolicy::Surface),
    )
    .unwrap();
    let records = store.fetch(&FetchRequest::new(events())).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("priority"), Some(&Value::I64(1)));
    assert_eq!(records[0].get("duration_secs"), None);
    assert_eq!(
        records[0].get("title"),
        Some(&Value::String("Standup".to_string()))
    );
}

#[test]
fn migration_without_inferable_mapping_fails_bootstrap() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store
            .submit(|scope| scope.insert(&events(), event("a", "Standup")))
            .unwrap();
        store.drain();
    }

    // Required attribute added with no default: existing records cannot be
    // upgraded
    let bad_schema = SchemaDescriptor::from_toml_str(
        r#"
        [[entity]]
        name = "event"

          [[entity.attribute]]
          name = "title"
          type = "string"

          [[entity.attribute]]
          name = "organizer"
          type = "string"
        "#,
    )
    .unwrap();

    let err = Store::open(
        OpenOptions::new(dir.path(), bad_schema).fault_policy(FaultPolicy::Surface),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Migration(_)));
}

#[test]
fn entity_added_by_migration_starts_empty() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir);
        store
            .submit(|scope| scope.insert(&events(), event("a", "Standup")))
            .unwrap();
        store.drain();
    }

    let mut extended = schema();
    extended.entities.push(
        SchemaDescriptor::from_toml_str(
            r#"
            [[entity]]
            name = "reminder"
              [[entity.attribute]]
              name = "note"
              type = "string"
            "#,
        )
        .unwrap()
        .entities
        .remove(0),
    );

    let store =
        Store::open(OpenOptions::new(dir.path(), extended).fault_policy(FaultPolicy::Surface))
            .unwrap();
    assert!(store.is_entity_empty(&EntityKind::new("reminder")).unwrap());
    assert!(!store.is_entity_empty(&events()).unwrap());
}
