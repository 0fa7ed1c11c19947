//! Persistence Integration Tests
//!
//! End-to-end coverage of the store facade: hierarchy visibility,
//! propagation-before-completion, concurrent fan-in, durability across
//! reopen, and schema migration.

mod common;

mod concurrency;
mod durability;
mod lifecycle;
mod visibility;
