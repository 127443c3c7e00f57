//! # lq-core — The "Physics" of LOGQ
//!
//! A log record is an open map from field name to any JSON value. This
//! crate holds the record model and the query engine that runs over it:
//!
//! - [`query::validator`] checks a raw query's shape before anything runs.
//! - [`query::condition`] evaluates conditions and where-clause trees.
//! - [`query::pipeline`] filters, projects, groups, orders and paginates.
//! - [`query::executor`] ties validation, a [`store::RecordStore`] read and
//!   the pipeline together.
//!
//! Everything except the executor is pure and synchronous, so one engine
//! can serve concurrent requests without locks. Each query is a full scan.

pub mod error;
pub mod query;
pub mod store;
pub mod value;

pub use error::{QueryError, StoreError, ValidationErrors, ValidationIssue};
pub use query::executor::{execute, execute_query};
pub use query::pipeline::run;
pub use query::validator::{validate, ValidationResult};
pub use query::{Condition, Direction, Operator, OrderBy, Query, QueryResult, WhereClause};
pub use store::{MemoryStore, RecordStore};

/// One stored log entry.
pub type Record = serde_json::Map<String, serde_json::Value>;
