//! # Query Executor
//!
//! Validates a raw query, pulls every record from a [`RecordStore`] and
//! runs the result pipeline. This is the only part of the query engine
//! that touches I/O. Failures are terminal: no retries, no partial results.

use std::time::Instant;

use serde_json::Value;

use super::{pipeline, validator, Query, QueryResult};
use crate::error::{QueryError, Result};
use crate::store::RecordStore;

/// Validate `raw` and execute it against `store`.
///
/// An invalid query is rejected before the store is read.
pub fn execute(raw: &Value, store: &dyn RecordStore) -> Result<QueryResult> {
    let query = validator::parse(raw).map_err(|e| {
        tracing::debug!(issues = e.issues().len(), "query rejected: {}", e);
        QueryError::Invalid(e)
    })?;
    execute_query(&query, store)
}

/// Execute an already parsed query against `store`.
pub fn execute_query(query: &Query, store: &dyn RecordStore) -> Result<QueryResult> {
    let start = Instant::now();

    let records = store.read_all().map_err(|e| {
        tracing::warn!("record store read failed: {}", e);
        QueryError::Store(e)
    })?;

    let result = pipeline::run(query, &records);

    tracing::debug!(
        scanned = records.len(),
        total_count = result.total_count,
        count = result.count,
        elapsed_us = start.elapsed().as_micros() as u64,
        "query executed"
    );

    Ok(result)
}
