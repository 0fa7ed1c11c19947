//! Lamina engine: context hierarchy, save propagation, and the store facade
//!
//! The engine coordinates three concerns:
//! - **Context hierarchy**: an arena of isolated mutation/read scopes. The
//!   root scope (alone wired to durable storage) has the shared read scope
//!   as its child; per-thread write scopes are created on demand as children
//!   of the read scope and live for the process lifetime.
//! - **Save execution**: one dedicated worker thread runs submitted
//!   mutations strictly one at a time, then walks the context's parent
//!   chain committing each level's pending changes child-first, so
//!   completions fire only after the root has persisted.
//! - **Read facade**: fetches resolve the calling thread's scope and build
//!   a consistent view from the store scan plus the scope's overlay chain.
//!
//! Only the facade types are public; the hierarchy, pool, executor, and
//! propagation internals are crate-private.

#![warn(clippy::all)]

mod arena;
mod config;
mod context;
mod executor;
mod handle;
mod manager;
mod pool;
mod propagate;
mod query;

pub use config::{FaultPolicy, OpenOptions, SCHEMA_FILE_NAME};
pub use executor::ExecutorStats;
pub use handle::ContextHandle;
pub use manager::{Store, StoreStats};
