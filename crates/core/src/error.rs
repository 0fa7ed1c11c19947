//! Error types shared across the system
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations. A single enum serves every crate; callers distinguish
//! the unrecoverable classes (bootstrap, commit, fetch) from ordinary
//! rejections via [`Error::is_unrecoverable`]. Unrecoverable faults are
//! non-continuable: whoever observes one must stop using the store.

use crate::types::ContextId;
use std::io;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the persistence core
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (snapshot file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot corruption detected (bad magic, checksum, or framing)
    #[error("snapshot corruption: {0}")]
    Corruption(String),

    /// Schema descriptor is invalid or unparseable
    #[error("schema error: {0}")]
    Schema(String),

    /// Stored data cannot be upgraded to the supplied schema
    #[error("migration error: {0}")]
    Migration(String),

    /// Store bootstrap failed before any operation was served
    #[error("bootstrap failure: {0}")]
    Bootstrap(String),

    /// Entity kind is not declared in the schema
    #[error("unknown entity kind: {0}")]
    UnknownEntity(String),

    /// Attribute is not declared on the entity
    #[error("unknown attribute `{attribute}` on entity `{entity}`")]
    UnknownAttribute {
        /// Entity kind name
        entity: String,
        /// Offending attribute name
        attribute: String,
    },

    /// Staged value does not match the declared attribute type
    #[error("type mismatch for `{entity}.{attribute}`: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Entity kind name
        entity: String,
        /// Attribute name
        attribute: String,
        /// Declared type name
        expected: &'static str,
        /// Supplied value type name
        actual: &'static str,
    },

    /// Required attribute is absent and has no default
    #[error("missing required attribute `{attribute}` on entity `{entity}`")]
    MissingAttribute {
        /// Entity kind name
        entity: String,
        /// Missing attribute name
        attribute: String,
    },

    /// Commit failed while propagating saves through the context chain
    #[error("commit failed at {context}: {source}")]
    CommitFailed {
        /// Context whose commit step failed
        context: ContextId,
        /// Underlying failure
        source: Box<Error>,
    },

    /// An earlier unrecoverable fault poisoned the store
    #[error("store poisoned by an earlier unrecoverable fault")]
    Poisoned,

    /// The save executor has been shut down
    #[error("save executor is shut down")]
    ShutDown,
}

impl Error {
    /// True for the non-continuable fault classes: bootstrap, commit, and
    /// fetch failures, including their I/O, serialization, corruption, and
    /// schema causes. `ShutDown` is the only ordinary rejection.
    pub fn is_unrecoverable(&self) -> bool {
        !matches!(self, Error::ShutDown)
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Schema(e.to_string())
    }
}
