//! # lq-hub — LOGQ Ingestion and Query Hub
//!
//! HTTP front of the query engine:
//!
//! | Route                           | Purpose                           |
//! |---------------------------------|-----------------------------------|
//! | `GET  /api/status`              | version, store kind, record count |
//! | `POST /api/logs`                | ingest one record or a batch      |
//! | `POST /api/logs/query`          | run a query                       |
//! | `POST /api/logs/query/validate` | validate a query without running  |

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use lq_core::RecordStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod ingest;

pub use config::Config;

pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    /// Human-readable description of the store, e.g. `journal (logs.journal)`.
    pub store_kind: String,
    pub config: Config,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, store_kind: impl Into<String>, config: Config) -> Self {
        Self {
            store,
            store_kind: store_kind.into(),
            config,
            start_time: Instant::now(),
        }
    }
}

/// Build the hub's router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/api/status", get(api::status))
        .route("/api/logs", post(api::ingest_logs))
        .route("/api/logs/query", post(api::execute_query))
        .route("/api/logs/query/validate", post(api::validate_query))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
