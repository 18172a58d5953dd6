//! Roster - Main Entry Point
//! JSON-RPC server over the queue engine

mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Backend, DaemonConfig, LogFormat};
use roster_api_rpc::{RpcServer, RpcServerConfig};
use roster_core::application::QueueEngine;
use roster_core::port::time_provider::SystemTimeProvider;
use roster_core::port::{QueueStore, RandomShuffler};
use roster_infra_document::{DocumentCollection, DocumentQueueStore};
use roster_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env().context("Invalid configuration")?;

    // 2. Initialize logging
    init_logging(config.log_format);
    info!("Roster v{} starting...", VERSION);

    // 3. Open the backing store
    let store = open_store(&config.backend).await?;

    // 4. Setup engine (DI wiring)
    let engine = QueueEngine::new(store, config.engine_config());

    // 5. Serve until Ctrl+C; the store is closed whatever happens
    let served = serve(&config, engine.clone()).await;

    if let Err(e) = engine.close().await {
        error!(error = %e, "Failed to close store");
    }

    match &served {
        Ok(()) => info!("Shutdown complete."),
        Err(e) => error!(error = ?e, "Daemon stopped with error"),
    }
    served
}

fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roster=info"));

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

async fn open_store(backend: &Backend) -> Result<Arc<dyn QueueStore>> {
    match backend {
        Backend::Sqlite { db_path } => {
            info!(db_path = %db_path, "Initializing database...");

            if let Some(parent) = std::path::Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create directory {}", parent.display())
                    })?;
                }
            }

            let pool = create_pool(db_path)
                .await
                .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
            run_migrations(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

            Ok(Arc::new(SqliteQueueStore::new(
                pool,
                Arc::new(SystemTimeProvider),
                Arc::new(RandomShuffler),
            )))
        }
        Backend::Document { path } => {
            let collection = match path {
                Some(path) => {
                    info!(path = %path.display(), "Opening document collection...");
                    DocumentCollection::open(path)
                        .await
                        .map_err(|e| anyhow::anyhow!("Document collection open failed: {}", e))?
                }
                None => {
                    info!("Using in-memory document collection");
                    DocumentCollection::in_memory()
                }
            };

            Ok(Arc::new(DocumentQueueStore::new(
                Arc::new(collection),
                Arc::new(RandomShuffler),
            )))
        }
    }
}

async fn serve(config: &DaemonConfig, engine: QueueEngine) -> Result<()> {
    info!("Starting JSON-RPC server...");
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, engine)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");

    // Wait for shutdown signal
    let signal = tokio::signal::ctrl_c().await;

    info!("Shutdown signal received. Exiting gracefully...");

    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    signal.context("Failed to listen for shutdown signal")
}
