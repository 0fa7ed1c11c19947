//! Shared helpers for the persistence suite

use lamina::{EntityKind, OpenOptions, Record, RecordId, SchemaDescriptor, Store, Value};
use lamina::FaultPolicy;
use std::sync::Arc;
use std::sync::Once;
use tempfile::TempDir;

pub const EVENT_SCHEMA: &str = r#"
    [[entity]]
    name = "event"

      [[entity.attribute]]
      name = "title"
      type = "string"

      [[entity.attribute]]
      name = "location"
      type = "string"
      optional = true

      [[entity.attribute]]
      name = "starts_at"
      type = "timestamp"
      default = "2017-03-19T09:00:00Z"

      [[entity.attribute]]
      name = "duration_secs"
      type = "int"
      default = 3600
"#;

static LOG_INIT: Once = Once::new();

/// Opt-in log output for debugging test failures (RUST_LOG-style levels
/// are controlled by the subscriber default).
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn events() -> EntityKind {
    EntityKind::new("event")
}

pub fn schema() -> SchemaDescriptor {
    SchemaDescriptor::from_toml_str(EVENT_SCHEMA).unwrap()
}

/// Open a store on a fresh temp directory with the surface fault policy,
/// so a test failure never takes the harness down with it.
pub fn open_store(dir: &TempDir) -> Arc<Store> {
    init_logging();
    Store::open(OpenOptions::new(dir.path(), schema()).fault_policy(FaultPolicy::Surface)).unwrap()
}

pub fn event(id: &str, title: &str) -> Record {
    Record::new(RecordId::new(id)).with("title", Value::String(title.to_string()))
}
