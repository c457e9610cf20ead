//! Storage Layer - Data Store Gateway
//!
//! Implements the Repository pattern over two backends:
//! - **PostgreSQL**: production store, schema in `migrations`
//! - **Memory**: `parking_lot`-guarded tables for tests and offline runs
//!
//! ## Architecture
//! ```text
//! [Services]
//!      ↓
//! [Repository Traits]  (StorageManager)
//!      ↓
//! ┌───────────────────┬──────────────┐
//! │ PostgresStore     │ MemoryStore  │
//! │ + PgRepo adapters │              │
//! └───────────────────┴──────────────┘
//! ```

pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod postgres_repo_adapter;
pub mod repository;
pub mod seed_data;

use std::sync::Arc;
use tracing::info;

use self::memory::MemoryStore;
use self::postgres::PostgresStore;
pub use self::repository::{RepoResult, StorageManager, StoreError};

/// Connect to PostgreSQL, migrate, seed the catalogs and wire the repositories
pub async fn init_storage(
    postgres_url: &str,
    pg_max_connections: u32,
) -> Result<StorageManager, StoreError> {
    let pg = Arc::new(PostgresStore::new(postgres_url, pg_max_connections).await?);
    info!("PostgreSQL progress store initialized");

    let manager = StorageManager::postgres(pg);
    seed_data::seed_all(&manager).await?;

    info!("StorageManager initialized with 11 repositories (PostgreSQL)");
    Ok(manager)
}

/// Seeded in-memory storage
pub async fn init_memory_storage() -> Result<(StorageManager, Arc<MemoryStore>), StoreError> {
    let store = Arc::new(MemoryStore::new());
    let manager = StorageManager::in_memory(store.clone());
    seed_data::seed_all(&manager).await?;

    info!("StorageManager initialized with 11 repositories (memory)");
    Ok((manager, store))
}
