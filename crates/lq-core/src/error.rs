//! Error types for query validation and execution.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed error returned by a [`crate::store::RecordStore`].
///
/// The core never inspects it; it travels to the caller as-is.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// One structural problem found in a raw query, with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON-path-like location, e.g. `$.where.and[1].operator`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found in a rejected query. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid query: {}", summarize(.0))]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl ValidationErrors {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![ValidationIssue::new(path, message)])
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure of a query request as seen by the caller.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query was rejected before any data was read.
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    /// The record store failed to produce its records.
    #[error(transparent)]
    Store(StoreError),
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
