//! Foundational identifier and value types
//!
//! - `EntityKind`: name of an entity table declared in the schema
//! - `RecordId`: stable string identifier of a stored record
//! - `ContextId`: arena index of a mutation/read scope
//! - `Value`: unified attribute value enum
//! - `Record`: attribute map with a stable identifier

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Name of an entity kind declared in the schema descriptor.
///
/// Entity kinds key the store's tables and the staged operations of a
/// write set, so the type is ordered and hashable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKind(String);

impl EntityKind {
    /// Create an entity kind from a name
    pub fn new(name: impl Into<String>) -> Self {
        EntityKind(name.into())
    }

    /// The kind name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKind {
    fn from(name: &str) -> Self {
        EntityKind(name.to_string())
    }
}

/// Stable string identifier of a record.
///
/// Identifiers are supplied by the caller or generated as UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a record id from an existing identifier string
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    /// Generate a fresh random identifier (UUID v4)
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId(id.to_string())
    }
}

/// Arena index of a context in the hierarchy.
///
/// Contexts are allocated parent-first, so a context's parent always has a
/// smaller index and parent chains are trivially finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(u32);

impl ContextId {
    /// Create a context id from a raw arena index
    pub fn new(index: u32) -> Self {
        ContextId(index)
    }

    /// The arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Unified attribute value.
///
/// Timestamps are UTC; integer/float comparisons widen the integer side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (allowed only for optional attributes)
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    I64(i64),
    /// 64-bit float
    F64(f64),
    /// UTF-8 string
    String(String),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Name of the value's runtime type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Compare two values of comparable types.
    ///
    /// Integer and float compare numerically against each other; all other
    /// cross-type comparisons (and any comparison involving NaN) return None.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::I64(a), Value::I64(b)) => Some(a.cmp(b)),
            (Value::F64(a), Value::F64(b)) => a.partial_cmp(b),
            (Value::I64(a), Value::F64(b)) => (*a as f64).partial_cmp(b),
            (Value::F64(a), Value::I64(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I64(i) => write!(f, "{}", i),
            Value::F64(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// A stored application object: stable identifier plus attribute map.
///
/// Records are validated and normalized against the schema when staged on a
/// context, never on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record with the given identifier
    pub fn new(id: RecordId) -> Self {
        Record {
            id,
            attributes: BTreeMap::new(),
        }
    }

    /// Create an empty record with a generated identifier
    pub fn generate() -> Self {
        Record::new(RecordId::generate())
    }

    /// Builder-style attribute setter
    pub fn with(mut self, attribute: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(attribute.into(), value);
        self
    }

    /// The record's stable identifier
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Look up an attribute value
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Set an attribute value
    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.attributes.insert(attribute.into(), value);
    }

    /// Remove an attribute, returning its previous value
    pub fn remove(&mut self, attribute: &str) -> Option<Value> {
        self.attributes.remove(attribute)
    }

    /// Iterate attributes in name order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}
