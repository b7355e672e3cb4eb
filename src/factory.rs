//! Factory functions for creating production-ready record stores
//!
//! Every store returned here is wrapped in `TracedStore`, so store calls are
//! logged the same way regardless of the backend.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::contracts::RecordStore;
use crate::file_storage::create_file_store;
use crate::memory_store::MemoryStore;
use crate::postgres_store::PostgresStore;
use crate::wrappers::create_wrapped_store;

/// Open the store selected by `config`
///
/// # Arguments
/// * `config` - backend choice plus its location (data directory or database URL)
pub async fn create_record_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory record store");
            Arc::new(create_wrapped_store(MemoryStore::new()))
        }
        StorageBackend::File => {
            info!("Using file record store at {}", config.data_dir);
            Arc::new(create_file_store(&config.data_dir).await?)
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("postgres backend requires storage.database_url or DATABASE_URL")?;
            let store =
                PostgresStore::connect(url, config.max_connections, config.connect_timeout)
                    .await?;
            Arc::new(create_wrapped_store(store))
        }
    };
    Ok(store)
}
