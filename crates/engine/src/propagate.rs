//! Save propagation: commit pending changes child→root
//!
//! Starting at the mutated scope, each level with pending changes commits
//! synchronously before its parent: a non-root commit takes the scope's
//! write set under its private lock and merges it into the parent's pending
//! set; the root commit applies the set to the durable store and persists a
//! snapshot, which is the durability point. Levels with no pending changes are
//! skipped, so propagating a clean chain performs no commit at any level
//! and touches neither the snapshot nor the commit generation.
//!
//! The whole walk runs under the write side of the commit gate. Readers
//! hold the read side while building a view, so no fetch can observe a
//! write set mid-hop between two levels.

use crate::manager::Shared;
use lamina_core::{ContextId, Error, Result};
use tracing::{debug, trace};

pub(crate) fn propagate(shared: &Shared, from: ContextId) -> Result<()> {
    let _gate = shared.commit_gate.write();

    // Allocation order makes every parent id smaller than its child's, so
    // this chain is finite and ends at the root
    for context in shared.arena.chain(from) {
        if !context.has_pending() {
            trace!(context = %context.id(), "clean scope, skipping commit");
            continue;
        }
        let set = context.take_pending();

        match context.parent() {
            Some(parent) => {
                debug!(
                    context = %context.id(),
                    parent = %parent,
                    confinement = ?context.confinement(),
                    ops = set.len(),
                    "committing scope into parent"
                );
                shared.arena.get(parent).merge_pending(set);
            }
            None => {
                // Root: apply to the durable store. A failure here is
                // terminal: the in-memory hierarchy has already absorbed
                // the changes and silently continuing risks data loss.
                let ops = set.len();
                let generation =
                    shared
                        .store
                        .apply(&set)
                        .map_err(|source| Error::CommitFailed {
                            context: context.id(),
                            source: Box::new(source),
                        })?;
                debug!(ops, generation, "root committed to durable store");
            }
        }
    }

    Ok(())
}
