use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lq_core::{MemoryStore, RecordStore};
use lq_hub::{AppState, Config};
use lq_io::Journal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "lq-hub", version, about = "LOGQ ingestion and query hub")]
struct Args {
    /// Path to the journal file
    #[arg(long, default_value = "logs.journal")]
    journal: PathBuf,

    /// Keep records in memory only (nothing survives a restart)
    #[arg(long)]
    memory: bool,

    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Path to config file
    #[arg(long, default_value = "lq-hub.toml")]
    config: PathBuf,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "lq_hub=info,lq_core=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config);

    let addr: SocketAddr = match args.bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address {:?}: {}", args.bind, e);
            std::process::exit(1);
        }
    };

    let mut journal = None;
    let (store, store_kind): (Arc<dyn RecordStore>, String) = if args.memory {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        (store, "memory".into())
    } else {
        match Journal::open(&args.journal) {
            Ok(j) => {
                let j = Arc::new(j);
                journal = Some(j.clone());
                let store: Arc<dyn RecordStore> = j;
                (store, format!("journal ({})", args.journal.display()))
            }
            Err(e) => {
                tracing::error!("Failed to open journal at {:?}: {}", args.journal, e);
                std::process::exit(1);
            }
        }
    };

    let state = Arc::new(AppState::new(store, store_kind.clone(), config));
    let app = lq_hub::router(state);

    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("  LOGQ hub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Status:   http://{}/api/status", addr);
    tracing::info!("  Ingest:   POST http://{}/api/logs", addr);
    tracing::info!("  Query:    POST http://{}/api/logs/query", addr);
    tracing::info!("  Store:    {}", store_kind);
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    if let Some(journal) = journal {
        match journal.sync() {
            Ok(()) => tracing::info!("Journal synced to {:?}", journal.path()),
            Err(e) => tracing::error!("Failed to sync journal: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
