//! # API Handlers
//!
//! Axum handlers for ingestion, querying and validation. Store access is
//! blocking and runs on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use lq_core::{QueryError, QueryResult, StoreError, ValidationIssue, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ingest;
use crate::AppState;

/// Error body for the non-query routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
}

type Failure = (StatusCode, Json<ApiError>);

fn failure(status: StatusCode, error: impl Into<String>) -> Failure {
    (
        status,
        Json(ApiError {
            success: false,
            error: error.into(),
        }),
    )
}

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub store: String,
    pub records: usize,
    pub uptime_seconds: u64,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, Failure> {
    let store = state.store.clone();
    let records = tokio::task::spawn_blocking(move || store.read_all().map(|r| r.len()))
        .await
        .map_err(|e| failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").into(),
        store: state.store_kind.clone(),
        records,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}

// =============================================================================
// Ingestion
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub count: usize,
}

pub async fn ingest_logs(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), Failure> {
    let Json(payload) = payload.map_err(|e| failure(e.status(), e.body_text()))?;
    let records = ingest::prepare(payload, &state.config.ingest)
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e))?;

    let store = state.store.clone();
    let count = tokio::task::spawn_blocking(move || store.append_all(records))
        .await
        .map_err(|e| failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e: StoreError| {
            tracing::error!("Ingest failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    tracing::info!(count, "Ingested records");
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            success: true,
            count,
        }),
    ))
}

// =============================================================================
// Query
// =============================================================================

/// Envelope returned by the query route, on success and on failure.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueryResponse {
    pub success: bool,
    pub data: Vec<Value>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

impl QueryResponse {
    fn ok(result: QueryResult) -> Self {
        Self {
            success: true,
            data: result.data,
            count: result.count,
            total_count: Some(result.total_count),
            error: None,
            errors: None,
        }
    }

    fn failed(error: String, errors: Option<Vec<ValidationIssue>>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            count: 0,
            total_count: None,
            error: Some(error),
            errors,
        }
    }
}

type QueryFailure = (StatusCode, Json<QueryResponse>);

fn query_failure(status: StatusCode, error: impl Into<String>) -> QueryFailure {
    (status, Json(QueryResponse::failed(error.into(), None)))
}

impl From<QueryError> for QueryResponse {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Invalid(invalid) => {
                let message = invalid.to_string();
                QueryResponse::failed(message, Some(invalid.0))
            }
            QueryError::Store(e) => QueryResponse::failed(e.to_string(), None),
        }
    }
}

pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueryResponse>, QueryFailure> {
    let Json(raw) = payload.map_err(|e| query_failure(e.status(), e.body_text()))?;

    let store = state.store.clone();
    let outcome = tokio::task::spawn_blocking(move || lq_core::execute(&raw, store.as_ref()))
        .await
        .map_err(|e| query_failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match outcome {
        Ok(result) => Ok(Json(QueryResponse::ok(result))),
        Err(err) => {
            let status = match err {
                QueryError::Invalid(_) => StatusCode::BAD_REQUEST,
                QueryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(err.into())))
        }
    }
}

/// Always answers 200; the verdict is in the body.
pub async fn validate_query(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ValidationResult>, Failure> {
    let Json(raw) = payload.map_err(|e| failure(e.status(), e.body_text()))?;
    Ok(Json(lq_core::validate(&raw)))
}
