//! Context pool: maps the calling thread to its scope
//!
//! The designated reader thread always resolves to the shared read scope.
//! Any other thread resolves to a dedicated queue-confined write scope,
//! created on first use with the read scope as parent and cached in the
//! registry for the life of the process. Registry entries are written once
//! and immutable afterwards, so hits read without contention; concurrent
//! first-time misses on different threads insert under the map's sharded
//! locks and cannot corrupt it.

use crate::arena::ContextArena;
use crate::context::{Confinement, Context};
use dashmap::DashMap;
use lamina_core::ContextId;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::debug;

pub(crate) struct ContextPool {
    arena: Arc<ContextArena>,
    reader_thread: ThreadId,
    read_context: ContextId,
    registry: DashMap<ThreadId, ContextId>,
}

impl ContextPool {
    pub(crate) fn new(
        arena: Arc<ContextArena>,
        reader_thread: ThreadId,
        read_context: ContextId,
    ) -> Self {
        ContextPool {
            arena,
            reader_thread,
            read_context,
            registry: DashMap::new(),
        }
    }

    /// Resolve the scope for the calling thread. Callable from any thread.
    pub(crate) fn resolve(&self) -> Arc<Context> {
        let thread = thread::current().id();
        if thread == self.reader_thread {
            return self.arena.get(self.read_context);
        }

        if let Some(entry) = self.registry.get(&thread) {
            return self.arena.get(*entry);
        }

        // First use from this thread: create its write scope. The entry API
        // holds the shard lock across the check-and-insert, so a thread
        // racing itself is impossible and distinct threads insert distinct
        // keys.
        let id = *self
            .registry
            .entry(thread)
            .or_insert_with(|| {
                let context = self
                    .arena
                    .alloc(Some(self.read_context), Confinement::QueueConfined);
                debug!(context = %context.id(), ?thread, "created write scope for thread");
                context.id()
            })
            .value();
        self.arena.get(id)
    }

    /// Number of scopes in the hierarchy, including root and read scopes
    pub(crate) fn context_count(&self) -> usize {
        self.arena.len()
    }
}
