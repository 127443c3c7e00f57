//! # Query Model
//!
//! Declarative queries over open log records. A query is a nested data
//! structure, not a string language:
//!
//! ```json
//! {
//!   "find": ["level", "service"],
//!   "where": {"and": [{"field": "level", "operator": "eq", "value": "error"},
//!                     {"not": {"field": "service", "operator": "starts-with", "value": "test-"}}]},
//!   "group-by": ["service"],
//!   "order-by": [["count", "desc"], "service"],
//!   "limit": 10,
//!   "offset": 0
//! }
//! ```
//!
//! Raw payloads go through [`validator::parse`] before they become a
//! [`Query`]; nothing downstream re-checks shape.

pub mod condition;
pub mod executor;
pub mod pipeline;
pub mod validator;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationErrors;

/// A parsed, validated query. Every part is optional; the empty query
/// returns all records untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Query {
    /// Projection: fields to keep, in output order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<Vec<String>>,
    /// Filter tree.
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<WhereClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderBy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Query {
    /// Validate a raw query value and parse it.
    pub fn parse(raw: &Value) -> Result<Self, ValidationErrors> {
        validator::parse(raw)
    }
}

/// The recursive boolean filter. Each node owns its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhereClause {
    Condition(Condition),
    And { and: Vec<WhereClause> },
    Or { or: Vec<WhereClause> },
    Not { not: Box<WhereClause> },
}

impl WhereClause {
    pub fn condition(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self::Condition(Condition::new(field, operator, value))
    }

    pub fn and(clauses: Vec<WhereClause>) -> Self {
        Self::And { and: clauses }
    }

    pub fn or(clauses: Vec<WhereClause>) -> Self {
        Self::Or { or: clauses }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(clause: WhereClause) -> Self {
        Self::Not {
            not: Box::new(clause),
        }
    }
}

/// A leaf predicate over one record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// The fixed operator vocabulary. Wire names are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Contains => "contains",
            Self::StartsWith => "starts-with",
            Self::EndsWith => "ends-with",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Applies this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// One `order-by` key. On the wire either `"field"` or `["field", "desc"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OrderByWire", into = "OrderByWire")]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OrderByWire {
    Field(String),
    Pair(String, Direction),
}

impl From<OrderByWire> for OrderBy {
    fn from(wire: OrderByWire) -> Self {
        match wire {
            OrderByWire::Field(field) => Self::asc(field),
            OrderByWire::Pair(field, direction) => Self { field, direction },
        }
    }
}

impl From<OrderBy> for OrderByWire {
    fn from(order: OrderBy) -> Self {
        OrderByWire::Pair(order.field, order.direction)
    }
}

/// Output of the result pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueryResult {
    /// Final entries: records, projected records, or group entries.
    pub data: Vec<Value>,
    /// Length of `data`.
    pub count: usize,
    /// Records that passed the filter, before grouping and pagination.
    pub total_count: usize,
}
