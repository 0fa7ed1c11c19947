//! Durable store for Lamina
//!
//! This crate owns physical persistence:
//! - `DurableStore`: per-kind record tables behind a RwLock, applied-to by
//!   the root context's commit step and scanned by the read path
//! - snapshot file format: header + schema + per-entity bincode sections +
//!   CRC32 trailer, replaced atomically on every commit
//! - lightweight migration: stored records upgraded in place at open when
//!   the supplied schema differs from the persisted one

#![warn(clippy::all)]

mod migrate;
mod snapshot;
mod store;

pub use snapshot::{SnapshotData, SnapshotInfo, TableMap, SNAPSHOT_FILE_NAME};
pub use store::DurableStore;
