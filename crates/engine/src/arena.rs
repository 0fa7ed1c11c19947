//! Context arena: ownership of every scope in the hierarchy
//!
//! Contexts are held in a flat vector indexed by `ContextId` and are never
//! removed. Allocation happens under the write lock; lookups clone the Arc
//! under the read lock. Parent links always point at already-allocated
//! slots, so chain walks cannot cycle and always terminate at the root.

use crate::context::{Confinement, Context};
use lamina_core::ContextId;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct ContextArena {
    contexts: RwLock<Vec<Arc<Context>>>,
}

impl ContextArena {
    pub(crate) fn new() -> Self {
        ContextArena::default()
    }

    /// Allocate a new context. The parent, if any, must already live in
    /// this arena.
    pub(crate) fn alloc(&self, parent: Option<ContextId>, confinement: Confinement) -> Arc<Context> {
        let mut contexts = self.contexts.write();
        if let Some(parent) = parent {
            debug_assert!(parent.index() < contexts.len());
        }
        let id = ContextId::new(contexts.len() as u32);
        let context = Arc::new(Context::new(id, parent, confinement));
        contexts.push(Arc::clone(&context));
        context
    }

    pub(crate) fn get(&self, id: ContextId) -> Arc<Context> {
        Arc::clone(&self.contexts.read()[id.index()])
    }

    /// The chain from `from` up to and including the root
    pub(crate) fn chain(&self, from: ContextId) -> Vec<Arc<Context>> {
        let contexts = self.contexts.read();
        let mut links = Vec::new();
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let context = Arc::clone(&contexts[id.index()]);
            cursor = context.parent();
            links.push(context);
        }
        links
    }

    /// The chain from the root down to and including `to`: the order in
    /// which overlays apply when building a read view
    pub(crate) fn lineage(&self, to: ContextId) -> Vec<Arc<Context>> {
        let mut links = self.chain(to);
        links.reverse();
        links
    }

    pub(crate) fn len(&self) -> usize {
        self.contexts.read().len()
    }
}
