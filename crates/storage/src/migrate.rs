//! Lightweight in-place schema migration
//!
//! Runs once at open when the persisted descriptor differs from the supplied
//! one. The mapping is inferred: attributes present in both schemas carry
//! over (integers widen when the declared type moved from int to float),
//! removed attributes are stripped, added attributes fill from their default
//! (or null when optional). A required change with no way to fill existing
//! records is a migration fault and the open fails.

use crate::snapshot::TableMap;
use lamina_core::{AttributeType, EntityKind, Error, Result, SchemaDescriptor, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Upgrade stored tables from `old` to `new` in memory.
pub fn upgrade(tables: TableMap, old: &SchemaDescriptor, new: &SchemaDescriptor) -> Result<TableMap> {
    let mut upgraded = TableMap::new();

    for entity in &new.entities {
        let kind = EntityKind::new(entity.name.clone());
        let Some(old_entity) = old.entity(&kind) else {
            // Entity added: starts empty
            upgraded.insert(kind, BTreeMap::new());
            continue;
        };

        let table = tables.get(&kind).cloned().unwrap_or_default();
        let record_count = table.len();
        let mut migrated = BTreeMap::new();

        for (id, mut record) in table {
            for old_attr in &old_entity.attributes {
                let still_declared = entity.attribute(&old_attr.name).is_some();
                if !still_declared {
                    record.remove(&old_attr.name);
                }
            }

            for attr in &entity.attributes {
                let carried = match old_entity.attribute(&attr.name) {
                    Some(old_attr) => old_attr.ty == attr.ty
                        || (old_attr.ty == AttributeType::Int && attr.ty == AttributeType::Float),
                    None => false,
                };

                if carried {
                    if attr.ty == AttributeType::Float {
                        if let Some(Value::I64(i)) = record.get(&attr.name).cloned() {
                            record.set(attr.name.clone(), Value::F64(i as f64));
                        }
                    }
                    continue;
                }

                // Added attribute, or a type change with no inferable mapping:
                // refill from the default
                match attr.default_value()? {
                    Some(value) => record.set(attr.name.clone(), value),
                    None if attr.optional => record.set(attr.name.clone(), Value::Null),
                    None => {
                        return Err(Error::Migration(format!(
                            "cannot infer a value for required attribute `{}.{}` on existing records",
                            entity.name, attr.name
                        )));
                    }
                }
            }

            migrated.insert(id, record);
        }

        if record_count > 0 {
            info!(entity = %entity.name, records = record_count, "entity upgraded");
        }
        upgraded.insert(kind, migrated);
    }

    for entity in &old.entities {
        if new.entity(&EntityKind::new(entity.name.clone())).is_none() {
            let dropped = tables
                .get(&EntityKind::new(entity.name.clone()))
                .map(|t| t.len())
                .unwrap_or(0);
            warn!(entity = %entity.name, records = dropped, "entity removed from schema, dropping table");
        }
    }

    Ok(upgraded)
}
