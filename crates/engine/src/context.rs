//! A context: one isolated mutation/read scope in the hierarchy
//!
//! Every context owns its pending write set behind a private mutex. All
//! commit work on a scope runs under that mutex no matter which thread
//! drives it, which is what keeps concurrent writers from corrupting a
//! single scope's state. The read scope's *read* API is additionally
//! confined to the designated reader thread, enforced structurally by the
//! context pool (no other thread is ever handed the read scope).

use lamina_core::{ChangeOp, ContextId, EntityKind, RecordId, WriteSet};
use parking_lot::Mutex;

/// How a scope serializes access to its state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confinement {
    /// Commits run under the scope's private lock; any thread may drive them
    QueueConfined,
    /// Read API restricted to the designated reader thread; commits are
    /// driven by save propagation under the same private lock
    ReaderConfined,
}

/// One scope in the context hierarchy.
///
/// The parent link is an explicit arena index. Contexts are allocated
/// parent-first, so every parent id is smaller than its child's id and the
/// chain from any context reaches the root in finitely many steps.
#[derive(Debug)]
pub struct Context {
    id: ContextId,
    parent: Option<ContextId>,
    confinement: Confinement,
    pending: Mutex<WriteSet>,
}

impl Context {
    pub(crate) fn new(id: ContextId, parent: Option<ContextId>, confinement: Confinement) -> Self {
        Context {
            id,
            parent,
            confinement,
            pending: Mutex::new(WriteSet::new()),
        }
    }

    pub(crate) fn id(&self) -> ContextId {
        self.id
    }

    pub(crate) fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    pub(crate) fn confinement(&self) -> Confinement {
        self.confinement
    }

    /// Stage one operation on this scope
    pub(crate) fn stage(&self, kind: EntityKind, id: RecordId, op: ChangeOp) {
        self.pending.lock().stage(kind, id, op);
    }

    /// Whether the scope has uncommitted changes
    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Take the pending set, leaving the scope clean.
    ///
    /// This is the first half of a commit: the taken set is then merged
    /// into the parent (or applied to the store at the root).
    pub(crate) fn take_pending(&self) -> WriteSet {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Merge a child's committed set into this scope's pending set
    pub(crate) fn merge_pending(&self, set: WriteSet) {
        self.pending.lock().merge(set);
    }

    /// Run a closure against the pending set without taking it
    pub(crate) fn with_pending<R>(&self, f: impl FnOnce(&WriteSet) -> R) -> R {
        f(&self.pending.lock())
    }
}
