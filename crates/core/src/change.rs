//! Staged changes pending on a context
//!
//! A `WriteSet` buffers the mutations a context has accepted but not yet
//! committed. Commit moves the whole set one level up the parent chain in a
//! single merge; the root applies its set to durable storage. Within a set,
//! later operations on the same (kind, id) replace earlier ones, so a set
//! holds at most one effective operation per record.

use crate::types::{EntityKind, Record, RecordId};
use std::collections::BTreeMap;

/// One staged operation on a record
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOp {
    /// Insert or replace the record
    Upsert(Record),
    /// Mark the record for deletion
    Delete,
}

/// Ordered set of staged operations, keyed by (kind, id).
///
/// The pending-changes flag of a context is exactly `!write_set.is_empty()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    ops: BTreeMap<(EntityKind, RecordId), ChangeOp>,
}

impl WriteSet {
    /// Create an empty write set
    pub fn new() -> Self {
        WriteSet::default()
    }

    /// True when no operations are staged
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Stage an operation; replaces any earlier operation on the same record
    pub fn stage(&mut self, kind: EntityKind, id: RecordId, op: ChangeOp) {
        self.ops.insert((kind, id), op);
    }

    /// Look up the staged operation for a record
    pub fn get(&self, kind: &EntityKind, id: &RecordId) -> Option<&ChangeOp> {
        self.ops.get(&(kind.clone(), id.clone()))
    }

    /// Merge another set into this one; the other set's operations win.
    ///
    /// Used by commit: the child's taken set merges into the parent's
    /// pending set, where the child's later view of each record replaces
    /// whatever the parent had staged.
    pub fn merge(&mut self, other: WriteSet) {
        for (key, op) in other.ops {
            self.ops.insert(key, op);
        }
    }

    /// Iterate staged operations in (kind, id) order
    pub fn iter(&self) -> impl Iterator<Item = (&(EntityKind, RecordId), &ChangeOp)> {
        self.ops.iter()
    }

    /// Iterate staged operations for one kind, in id order
    pub fn iter_kind<'a>(
        &'a self,
        kind: &'a EntityKind,
    ) -> impl Iterator<Item = (&'a RecordId, &'a ChangeOp)> + 'a {
        self.ops
            .iter()
            .filter(move |((k, _), _)| k == kind)
            .map(|((_, id), op)| (id, op))
    }
}
