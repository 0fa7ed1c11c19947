//! The scope handle passed to submitted mutations
//!
//! Mutations never touch a context directly; they receive a `ContextHandle`
//! bound to the scope the worker resolved for its own thread. Staged
//! records are validated and normalized against the schema here, so nothing
//! malformed ever enters a write set.

use crate::context::Context;
use crate::manager::Shared;
use crate::query;
use lamina_core::{ChangeOp, ContextId, EntityKind, FetchRequest, Record, RecordId, Result};
use std::sync::Arc;

/// Schema-validated access to one scope.
pub struct ContextHandle {
    shared: Arc<Shared>,
    context: Arc<Context>,
}

impl ContextHandle {
    pub(crate) fn new(shared: Arc<Shared>, context: Arc<Context>) -> Self {
        ContextHandle { shared, context }
    }

    /// Stage an insert (or replacement) of a record.
    ///
    /// The record is validated against the entity definition and normalized
    /// (defaults filled, integers widened for float attributes) before it
    /// is staged.
    pub fn insert(&self, kind: &EntityKind, record: Record) -> Result<()> {
        let normalized = self.shared.store.schema().normalize_record(kind, record)?;
        let id = normalized.id().clone();
        self.context
            .stage(kind.clone(), id, ChangeOp::Upsert(normalized));
        Ok(())
    }

    /// Stage a deletion.
    pub fn delete(&self, kind: &EntityKind, id: &RecordId) -> Result<()> {
        self.shared.store.schema().require_entity(kind)?;
        self.context
            .stage(kind.clone(), id.clone(), ChangeOp::Delete);
        Ok(())
    }

    /// Fetch through this scope: staged-but-uncommitted changes on the
    /// scope are visible (read-your-writes), ancestors' pending changes
    /// and the durable state underneath them included.
    pub fn fetch(&self, request: &FetchRequest) -> Result<Vec<Record>> {
        query::fetch(&self.shared, &self.context, request)
    }

    /// Bounded emptiness check through this scope.
    pub fn is_entity_empty(&self, kind: &EntityKind) -> Result<bool> {
        query::is_entity_empty(&self.shared, &self.context, kind)
    }

    /// Identity of the underlying scope.
    pub fn context_id(&self) -> ContextId {
        self.context.id()
    }
}
