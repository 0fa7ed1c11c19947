//! Lamina: a layered, thread-aware embedded persistence core
//!
//! Lamina gives callers a consistent read view of stored data while
//! background mutation proceeds concurrently. Mutations run against
//! per-thread isolated scopes and are committed through a hierarchy of
//! scopes (each scope's pending changes merge into its parent, and the
//! root persists to a checksummed snapshot file) before any completion
//! callback fires.
//!
//! # Quick Start
//!
//! ```ignore
//! use lamina::{EntityKind, FetchRequest, OpenOptions, Record, RecordId, Store, Value};
//!
//! let store = Store::open(OpenOptions::with_schema_file("./data"))?;
//! let events = EntityKind::new("event");
//!
//! store.submit_with_completion(
//!     {
//!         let events = events.clone();
//!         move |scope| {
//!             let record = Record::new(RecordId::new("a"))
//!                 .with("title", Value::String("Standup".into()));
//!             scope.insert(&events, record)
//!         }
//!     },
//!     || println!("durably committed"),
//! )?;
//!
//! let records = store.fetch(&FetchRequest::new(events))?;
//! ```
//!
//! # Architecture
//!
//! Reads are synchronous against the calling thread's scope (the opening
//! thread shares one read scope; every other thread lazily gets its own
//! write scope). Mutations go through a single dedicated save worker, so
//! at most one mutation+save cycle is in flight at a time. Internal
//! layering (context hierarchy, save propagation, snapshot storage) is not
//! exposed; only the store facade and the core data types are public.

pub use lamina_core::{
    AttributeDef, AttributeType, ChangeOp, CompareOp, ContextId, DefaultValue, EntityDef,
    EntityKind, Error, FetchRequest, Predicate, Record, RecordId, Result, SchemaDescriptor,
    SortSpec, Value, WriteSet,
};
pub use lamina_engine::{
    ContextHandle, ExecutorStats, FaultPolicy, OpenOptions, Store, StoreStats, SCHEMA_FILE_NAME,
};
