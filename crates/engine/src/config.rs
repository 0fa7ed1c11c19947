//! Store configuration
//!
//! `OpenOptions` names the data directory, the schema source (an inline
//! descriptor or a `schema.toml` file), and the fault policy. The schema
//! file lives wherever the caller keeps configuration; by convention it sits
//! inside the data directory under [`SCHEMA_FILE_NAME`].

use lamina_core::{Error, Result, SchemaDescriptor};
use std::path::{Path, PathBuf};

/// Conventional schema file name inside the data directory
pub const SCHEMA_FILE_NAME: &str = "schema.toml";

/// What to do when an unrecoverable fault (bootstrap, commit, or fetch
/// failure) is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log the fault and abort the process. In-memory and durable state may
    /// have diverged; continuing risks silent data loss.
    #[default]
    Abort,
    /// Poison the store instead of aborting: the fault is recorded, further
    /// submits are rejected, and callers observe the error. The store is
    /// still non-continuable; this exists so embedding processes (and
    /// tests) decide for themselves how to die.
    Surface,
}

#[derive(Debug, Clone)]
enum SchemaSource {
    Inline(SchemaDescriptor),
    File(PathBuf),
}

/// Options for [`crate::Store::open`]
#[derive(Debug, Clone)]
pub struct OpenOptions {
    data_dir: PathBuf,
    schema: SchemaSource,
    fault_policy: FaultPolicy,
}

impl OpenOptions {
    /// Open with an inline schema descriptor
    pub fn new(data_dir: impl Into<PathBuf>, schema: SchemaDescriptor) -> Self {
        OpenOptions {
            data_dir: data_dir.into(),
            schema: SchemaSource::Inline(schema),
            fault_policy: FaultPolicy::default(),
        }
    }

    /// Open with the schema loaded from `schema.toml` in the data directory
    pub fn with_schema_file(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let schema_path = data_dir.join(SCHEMA_FILE_NAME);
        OpenOptions {
            data_dir,
            schema: SchemaSource::File(schema_path),
            fault_policy: FaultPolicy::default(),
        }
    }

    /// Open with the schema loaded from an explicit file path
    pub fn with_schema_path(data_dir: impl Into<PathBuf>, schema_path: impl Into<PathBuf>) -> Self {
        OpenOptions {
            data_dir: data_dir.into(),
            schema: SchemaSource::File(schema_path.into()),
            fault_policy: FaultPolicy::default(),
        }
    }

    /// Choose the fault policy (default: [`FaultPolicy::Abort`])
    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub(crate) fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn policy(&self) -> FaultPolicy {
        self.fault_policy
    }

    pub(crate) fn resolve_schema(&self) -> Result<SchemaDescriptor> {
        match &self.schema {
            SchemaSource::Inline(schema) => {
                schema.check()?;
                Ok(schema.clone())
            }
            SchemaSource::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Bootstrap(format!(
                        "cannot read schema file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                SchemaDescriptor::from_toml_str(&text)
            }
        }
    }
}
