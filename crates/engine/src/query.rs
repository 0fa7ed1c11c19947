//! Read-view construction and query evaluation
//!
//! A scope's consistent read view is the durable table for the requested
//! kind with the pending write sets of the scope's lineage (root first,
//! scope last) applied on top. The whole view is built under the read side
//! of the commit gate, so an in-flight propagation walk can never be
//! observed halfway.

use crate::context::Context;
use crate::manager::Shared;
use lamina_core::{ChangeOp, EntityKind, FetchRequest, Record, RecordId, Result, SortSpec};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Execute a fetch against the given scope.
pub(crate) fn fetch(
    shared: &Shared,
    context: &Context,
    request: &FetchRequest,
) -> Result<Vec<Record>> {
    let _gate = shared.commit_gate.read();

    let kind = request.kind();
    let mut visible = shared.store.scan(kind)?;
    for scope in shared.arena.lineage(context.id()) {
        scope.with_pending(|set| apply_overlay(&mut visible, kind, set));
    }

    let mut records: Vec<Record> = visible
        .into_values()
        .filter(|record| request.predicate().map_or(true, |p| p.matches(record)))
        .collect();

    if let Some(sort) = request.sort() {
        sort_records(&mut records, sort);
    }
    if let Some(limit) = request.limit() {
        records.truncate(limit);
    }

    Ok(records)
}

/// True iff no record of the kind is visible to the scope. Touches record
/// ids and staged operations only; full records are never materialized.
pub(crate) fn is_entity_empty(
    shared: &Shared,
    context: &Context,
    kind: &EntityKind,
) -> Result<bool> {
    let _gate = shared.commit_gate.read();

    shared.store.schema().require_entity(kind)?;

    // Effective staged operation per id across the lineage (scope wins)
    let mut staged: BTreeMap<RecordId, bool> = BTreeMap::new();
    for scope in shared.arena.lineage(context.id()) {
        scope.with_pending(|set| {
            for (id, op) in set.iter_kind(kind) {
                staged.insert(id.clone(), matches!(op, ChangeOp::Upsert(_)));
            }
        });
    }

    if staged.values().any(|visible| *visible) {
        return Ok(false);
    }

    // Any stored id without a staged delete is visible
    for id in shared.store.ids(kind)? {
        if !staged.contains_key(&id) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn apply_overlay(
    visible: &mut BTreeMap<RecordId, Record>,
    kind: &EntityKind,
    set: &lamina_core::WriteSet,
) {
    for (id, op) in set.iter_kind(kind) {
        match op {
            ChangeOp::Upsert(record) => {
                visible.insert(id.clone(), record.clone());
            }
            ChangeOp::Delete => {
                visible.remove(id);
            }
        }
    }
}

/// Sort records by the spec's attribute. Records missing the attribute (or
/// carrying an incomparable value) keep their position relative to each
/// other by id and sort after present values; ties break on id so results
/// are deterministic.
fn sort_records(records: &mut [Record], spec: &SortSpec) {
    records.sort_by(|a, b| {
        let left = a.get(&spec.attribute);
        let right = b.get(&spec.attribute);
        let primary = match (left, right) {
            (Some(x), Some(y)) => x
                .compare(y)
                .map(|ordering| {
                    if spec.ascending {
                        ordering
                    } else {
                        ordering.reverse()
                    }
                })
                .unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        primary.then_with(|| a.id().cmp(b.id()))
    });
}
