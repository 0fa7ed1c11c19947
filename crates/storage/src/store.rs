//! DurableStore: the on-disk backing store plus its schema descriptor
//!
//! Tables live in memory behind a `parking_lot::RwLock`; every applied
//! write set is immediately persisted as a fresh snapshot, so the durable
//! state on disk always matches the last committed generation. Only the
//! root context's commit step calls [`DurableStore::apply`]; the read path
//! uses [`DurableStore::scan`] and [`DurableStore::ids`].

use crate::migrate;
use crate::snapshot::{self, TableMap, SNAPSHOT_FILE_NAME};
use lamina_core::{EntityKind, Error, Record, RecordId, Result, SchemaDescriptor, WriteSet};
use lamina_core::ChangeOp;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// The durable store: schema descriptor + snapshot-backed record tables.
///
/// Thread-safe; commit application takes the write lock for the duration of
/// the in-memory update *and* the snapshot write, so scans never observe a
/// half-applied commit.
#[derive(Debug)]
pub struct DurableStore {
    schema: SchemaDescriptor,
    schema_toml: String,
    snapshot_path: PathBuf,
    tables: RwLock<TableMap>,
    /// Commit counter, stamped into every snapshot header
    generation: AtomicU64,
}

impl DurableStore {
    /// Open the store in `data_dir` with the supplied schema.
    ///
    /// Recovers the previous snapshot when one exists (verifying its
    /// checksum), upgrades records in place when the persisted schema
    /// differs, and writes the initial snapshot otherwise. Any failure here
    /// is a bootstrap fault: the store must not serve operations.
    pub fn open(data_dir: &Path, schema: SchemaDescriptor) -> Result<Self> {
        schema.check()?;
        std::fs::create_dir_all(data_dir)?;
        let snapshot_path = data_dir.join(SNAPSHOT_FILE_NAME);
        let schema_toml = schema.to_toml_string()?;

        let (tables, generation) = if snapshot_path.exists() {
            let data = snapshot::read(&snapshot_path)?;
            let stored_schema = SchemaDescriptor::from_toml_str(&data.schema_toml)?;
            if stored_schema == schema {
                (data.tables, data.generation)
            } else {
                info!(path = %snapshot_path.display(), "schema changed, upgrading store in place");
                let upgraded = migrate::upgrade(data.tables, &stored_schema, &schema)?;
                let generation = data.generation + 1;
                snapshot::write_atomic(&snapshot_path, &schema_toml, &upgraded, generation)?;
                (upgraded, generation)
            }
        } else {
            let tables: TableMap = schema
                .entities
                .iter()
                .map(|e| (EntityKind::new(e.name.clone()), BTreeMap::new()))
                .collect();
            snapshot::write_atomic(&snapshot_path, &schema_toml, &tables, 0)?;
            (tables, 0)
        };

        let record_count: usize = tables.values().map(|t| t.len()).sum();
        info!(
            path = %snapshot_path.display(),
            generation,
            entities = tables.len(),
            records = record_count,
            "durable store opened"
        );

        Ok(DurableStore {
            schema,
            schema_toml,
            snapshot_path,
            tables: RwLock::new(tables),
            generation: AtomicU64::new(generation),
        })
    }

    /// The schema the store was opened with
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Snapshot file location
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Current commit generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Apply a committed write set and persist the resulting state.
    ///
    /// This is the durability point of save propagation. The write lock is
    /// held across both the table update and the snapshot write; if the
    /// snapshot write fails, the in-memory and on-disk states have diverged
    /// and the error is terminal for the owning store.
    pub fn apply(&self, changes: &WriteSet) -> Result<u64> {
        let mut tables = self.tables.write();
        for ((kind, id), op) in changes.iter() {
            let table = tables
                .get_mut(kind)
                .ok_or_else(|| Error::UnknownEntity(kind.as_str().to_string()))?;
            match op {
                ChangeOp::Upsert(record) => {
                    table.insert(id.clone(), record.clone());
                }
                ChangeOp::Delete => {
                    table.remove(id);
                }
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        snapshot::write_atomic(&self.snapshot_path, &self.schema_toml, &tables, generation)?;
        debug!(generation, ops = changes.len(), "write set applied");
        Ok(generation)
    }

    /// Clone the table for one kind (the base layer of a read view)
    pub fn scan(&self, kind: &EntityKind) -> Result<BTreeMap<RecordId, Record>> {
        self.schema.require_entity(kind)?;
        let tables = self.tables.read();
        Ok(tables.get(kind).cloned().unwrap_or_default())
    }

    /// Record ids for one kind, without materializing records.
    ///
    /// Used by bounded emptiness checks.
    pub fn ids(&self, kind: &EntityKind) -> Result<Vec<RecordId>> {
        self.schema.require_entity(kind)?;
        let tables = self.tables.read();
        Ok(tables
            .get(kind)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Number of stored records across all kinds
    pub fn record_count(&self) -> usize {
        self.tables.read().values().map(|t| t.len()).sum()
    }
}
