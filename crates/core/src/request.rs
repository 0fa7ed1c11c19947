//! Declarative fetch requests
//!
//! A `FetchRequest` names an entity kind and optionally narrows, orders, and
//! bounds the result. Requests are evaluated against a context's consistent
//! read view (store scan plus the overlay chain), never against raw tables.

use crate::types::{EntityKind, Record, Value};
use std::cmp::Ordering;

/// Comparison operator for predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

/// Attribute predicate tree.
///
/// A missing attribute behaves as `Null`: it satisfies `Eq Null` / fails
/// `Ne Null`, and every ordering comparison against it is false.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Compare one attribute against a literal value
    Compare {
        /// Attribute name
        attribute: String,
        /// Comparison operator
        op: CompareOp,
        /// Literal to compare against
        value: Value,
    },
    /// All sub-predicates must hold
    And(Vec<Predicate>),
    /// At least one sub-predicate must hold
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `attribute == value`
    pub fn eq(attribute: impl Into<String>, value: Value) -> Self {
        Predicate::Compare {
            attribute: attribute.into(),
            op: CompareOp::Eq,
            value,
        }
    }

    /// `attribute != value`
    pub fn ne(attribute: impl Into<String>, value: Value) -> Self {
        Predicate::Compare {
            attribute: attribute.into(),
            op: CompareOp::Ne,
            value,
        }
    }

    /// `attribute < value`
    pub fn lt(attribute: impl Into<String>, value: Value) -> Self {
        Predicate::Compare {
            attribute: attribute.into(),
            op: CompareOp::Lt,
            value,
        }
    }

    /// `attribute > value`
    pub fn gt(attribute: impl Into<String>, value: Value) -> Self {
        Predicate::Compare {
            attribute: attribute.into(),
            op: CompareOp::Gt,
            value,
        }
    }

    /// Whether the record satisfies this predicate
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Compare {
                attribute,
                op,
                value,
            } => {
                let actual = record.get(attribute).unwrap_or(&Value::Null);
                match actual.compare(value) {
                    Some(ordering) => match op {
                        CompareOp::Eq => ordering == Ordering::Equal,
                        CompareOp::Ne => ordering != Ordering::Equal,
                        CompareOp::Lt => ordering == Ordering::Less,
                        CompareOp::Le => ordering != Ordering::Greater,
                        CompareOp::Gt => ordering == Ordering::Greater,
                        CompareOp::Ge => ordering != Ordering::Less,
                    },
                    // Incomparable types: only Ne holds
                    None => *op == CompareOp::Ne,
                }
            }
            Predicate::And(children) => children.iter().all(|p| p.matches(record)),
            Predicate::Or(children) => children.iter().any(|p| p.matches(record)),
        }
    }
}

/// Result ordering: one attribute, ascending or descending.
///
/// Records without the attribute (or with an incomparable value) sort last;
/// ties break on record id so results are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    /// Attribute to order by
    pub attribute: String,
    /// Ascending when true
    pub ascending: bool,
}

/// A declarative fetch against one entity kind
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    kind: EntityKind,
    predicate: Option<Predicate>,
    sort: Option<SortSpec>,
    limit: Option<usize>,
}

impl FetchRequest {
    /// Fetch all records of a kind, ordered by record id
    pub fn new(kind: EntityKind) -> Self {
        FetchRequest {
            kind,
            predicate: None,
            sort: None,
            limit: None,
        }
    }

    /// Narrow the result with a predicate
    pub fn filtered(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Order the result by an attribute
    pub fn sorted_by(mut self, attribute: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some(SortSpec {
            attribute: attribute.into(),
            ascending,
        });
        self
    }

    /// Bound the result length
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The requested entity kind
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// The predicate, if any
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// The sort spec, if any
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// The result bound, if any
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
