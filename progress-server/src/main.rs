use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};

use progress_core::logging::{init_tracing, TracingConfig};
use progress_server::config::{ServerConfig, StorageBackend};
use progress_server::metrics::ServerMetrics;
use progress_server::storage::{self, seed_data};
use progress_server::{api, Clock, Services, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    let mut tracing_config = TracingConfig::with_level(config.log_level);
    tracing_config
        .module_filters
        .push(("progress_server".to_string(), config.log_level));
    init_tracing(&tracing_config);

    info!("Starting progress server...");

    // ========================================================================
    // 1. Storage (migrations + catalog seeding happen here)
    // ========================================================================
    let storage = match config.storage_backend {
        StorageBackend::Postgres => {
            info!("Connecting to PostgreSQL: {}...", config.database_url);
            storage::init_storage(&config.database_url, config.pg_max_connections)
                .await
                .context("PostgreSQL initialization failed (is the database running?)")?
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            let (manager, _store) = storage::init_memory_storage().await?;
            manager
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    seed_data::seed_challenge(&storage, clock.today())
        .await
        .context("Seeding today's challenge failed")?;

    // ========================================================================
    // 2. Services + HTTP API
    // ========================================================================
    let metrics = ServerMetrics::new();
    let services = Services::new(storage, metrics.clone(), clock);
    let state = api::ApiState { services, metrics };

    tokio::select! {
        result = api::start_api_server(state, config.api_port) => {
            if let Err(e) = result {
                error!("API server error: {}", e);
                anyhow::bail!("API server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
