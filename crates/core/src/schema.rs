//! Schema descriptor: entity definitions, validation, TOML loading
//!
//! The descriptor is supplied at bootstrap (inline or from `schema.toml` in
//! the data directory) and persisted inside every snapshot so the store can
//! detect schema changes on the next open and upgrade records in place.
//!
//! ## File format
//!
//! ```toml
//! [[entity]]
//! name = "event"
//!
//!   [[entity.attribute]]
//!   name = "title"
//!   type = "string"
//!
//!   [[entity.attribute]]
//!   name = "location"
//!   type = "string"
//!   optional = true
//!
//!   [[entity.attribute]]
//!   name = "starts_at"
//!   type = "timestamp"
//!
//!   [[entity.attribute]]
//!   name = "duration_secs"
//!   type = "int"
//!   default = 3600
//! ```
//!
//! Timestamp defaults are written as RFC 3339 strings.

use crate::error::{Error, Result};
use crate::types::{EntityKind, Record, Value};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// UTC timestamp
    Timestamp,
}

impl AttributeType {
    /// Name used in diagnostics and the TOML format
    pub fn name(self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int => "int",
            AttributeType::Float => "float",
            AttributeType::Bool => "bool",
            AttributeType::Timestamp => "timestamp",
        }
    }

    /// Whether a value inhabits this type. `I64` inhabits `Float` via
    /// widening; `Null` inhabits nothing (optionality is checked separately).
    fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (AttributeType::String, Value::String(_))
                | (AttributeType::Int, Value::I64(_))
                | (AttributeType::Float, Value::F64(_))
                | (AttributeType::Float, Value::I64(_))
                | (AttributeType::Bool, Value::Bool(_))
                | (AttributeType::Timestamp, Value::Timestamp(_))
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default value as written in the TOML descriptor.
///
/// Untagged so the file reads naturally (`default = 3600`). Timestamp
/// defaults are RFC 3339 strings and are converted during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal (also used for timestamp defaults)
    Text(String),
}

/// Definition of one attribute of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: AttributeType,
    /// Whether the attribute may be absent/null
    #[serde(default)]
    pub optional: bool,
    /// Default applied when the attribute is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl AttributeDef {
    /// Resolve the declared default into a typed value, if any
    pub fn default_value(&self) -> Result<Option<Value>> {
        let Some(default) = &self.default else {
            return Ok(None);
        };
        let value = match (self.ty, default) {
            (AttributeType::Bool, DefaultValue::Bool(b)) => Value::Bool(*b),
            (AttributeType::Int, DefaultValue::Int(i)) => Value::I64(*i),
            (AttributeType::Float, DefaultValue::Float(x)) => Value::F64(*x),
            (AttributeType::Float, DefaultValue::Int(i)) => Value::F64(*i as f64),
            (AttributeType::String, DefaultValue::Text(s)) => Value::String(s.clone()),
            (AttributeType::Timestamp, DefaultValue::Text(s)) => {
                let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| {
                    Error::Schema(format!(
                        "default for timestamp attribute `{}` is not RFC 3339: {}",
                        self.name, e
                    ))
                })?;
                Value::Timestamp(parsed.into())
            }
            _ => {
                return Err(Error::Schema(format!(
                    "default for attribute `{}` does not match declared type {}",
                    self.name, self.ty
                )))
            }
        };
        Ok(Some(value))
    }
}

/// Definition of one entity kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity kind name
    pub name: String,
    /// Attribute definitions
    #[serde(rename = "attribute", default)]
    pub attributes: Vec<AttributeDef>,
}

impl EntityDef {
    /// Look up an attribute definition by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// The full schema descriptor: the set of entity definitions.
///
/// Equality is structural; the store compares the persisted descriptor with
/// the supplied one at open to decide whether migration is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Entity definitions
    #[serde(rename = "entity", default)]
    pub entities: Vec<EntityDef>,
}

impl SchemaDescriptor {
    /// Build a descriptor from entity definitions
    pub fn new(entities: Vec<EntityDef>) -> Self {
        SchemaDescriptor { entities }
    }

    /// Parse a descriptor from TOML text.
    ///
    /// Rejects duplicate entity or attribute names and invalid defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let descriptor: SchemaDescriptor = toml::from_str(text)?;
        descriptor.check()?;
        Ok(descriptor)
    }

    /// Render the descriptor as TOML text (persisted inside snapshots)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Schema(e.to_string()))
    }

    /// Look up an entity definition by kind
    pub fn entity(&self, kind: &EntityKind) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == kind.as_str())
    }

    /// Error unless the kind is declared
    pub fn require_entity(&self, kind: &EntityKind) -> Result<&EntityDef> {
        self.entity(kind)
            .ok_or_else(|| Error::UnknownEntity(kind.as_str().to_string()))
    }

    /// Validate internal consistency: unique names, resolvable defaults
    pub fn check(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(Error::Schema(format!(
                    "duplicate entity definition `{}`",
                    entity.name
                )));
            }
            let mut attrs = std::collections::BTreeSet::new();
            for attr in &entity.attributes {
                if !attrs.insert(attr.name.as_str()) {
                    return Err(Error::Schema(format!(
                        "duplicate attribute `{}` on entity `{}`",
                        attr.name, entity.name
                    )));
                }
                attr.default_value()?;
            }
        }
        Ok(())
    }

    /// Validate a record against the entity definition and return its
    /// normalized form: missing attributes filled from defaults (or null
    /// when optional), integers widened where the schema declares a float.
    ///
    /// Unknown attributes, type mismatches, and missing required attributes
    /// without a default are errors.
    pub fn normalize_record(&self, kind: &EntityKind, mut record: Record) -> Result<Record> {
        let entity = self.require_entity(kind)?;

        let staged: Vec<String> = record.attributes().map(|(name, _)| name.to_string()).collect();
        for name in &staged {
            let attr = entity.attribute(name).ok_or_else(|| Error::UnknownAttribute {
                entity: entity.name.clone(),
                attribute: name.clone(),
            })?;
            let value = record.get(name).cloned().unwrap_or(Value::Null);
            match value {
                Value::Null => {
                    if !attr.optional {
                        return Err(Error::MissingAttribute {
                            entity: entity.name.clone(),
                            attribute: name.clone(),
                        });
                    }
                }
                Value::I64(i) if attr.ty == AttributeType::Float => {
                    record.set(name.clone(), Value::F64(i as f64));
                }
                ref v if !attr.ty.admits(v) => {
                    return Err(Error::TypeMismatch {
                        entity: entity.name.clone(),
                        attribute: name.clone(),
                        expected: attr.ty.name(),
                        actual: v.type_name(),
                    });
                }
                _ => {}
            }
        }

        for attr in &entity.attributes {
            if record.get(&attr.name).is_some() {
                continue;
            }
            match attr.default_value()? {
                Some(value) => record.set(attr.name.clone(), value),
                None if attr.optional => record.set(attr.name.clone(), Value::Null),
                None => {
                    return Err(Error::MissingAttribute {
                        entity: entity.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
            }
        }

        Ok(record)
    }
}
