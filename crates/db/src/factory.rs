use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use clientela_core::config::{StoreBackend, StoreConfig};
use clientela_core::errors::StoreError;

use crate::latency::SimulatedLatency;
use crate::repositories::{
    CustomerStore, InMemoryCustomerStore, LocalCustomerStore, RestCustomerStore, SqlCustomerStore,
};
use crate::slot::FileSlot;
use crate::{connect_with_settings, migrations};

#[derive(Debug, Error)]
pub enum OpenStoreError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("remote store setup failed: {0}")]
    Remote(#[source] StoreError),
}

/// Builds the configured backend behind the shared store contract.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CustomerStore>, OpenStoreError> {
    let store: Arc<dyn CustomerStore> = match config.backend {
        StoreBackend::Local => {
            let slot = FileSlot::new(&config.data_dir, config.slot_key.clone());
            info!(
                event_name = "store.open",
                backend = "local",
                slot_path = %slot.path().display(),
                simulate_latency = config.simulate_latency,
                "opening slot-backed customer store"
            );
            Arc::new(LocalCustomerStore::with_latency(
                slot,
                SimulatedLatency::from_flag(config.simulate_latency),
            ))
        }
        StoreBackend::Memory => {
            info!(event_name = "store.open", backend = "memory", "opening in-memory customer store");
            Arc::new(InMemoryCustomerStore::default())
        }
        StoreBackend::Sqlite => {
            let pool = connect_with_settings(
                &config.database_url,
                config.max_connections,
                config.timeout_secs,
            )
            .await
            .map_err(OpenStoreError::DatabaseConnect)?;
            migrations::run_pending(&pool).await.map_err(OpenStoreError::Migration)?;
            info!(
                event_name = "store.open",
                backend = "sqlite",
                database_url = %config.database_url,
                "opening sqlite customer store"
            );
            Arc::new(SqlCustomerStore::new(pool))
        }
        StoreBackend::Rest => {
            let store = RestCustomerStore::new(
                &config.rest_base_url,
                Duration::from_secs(config.timeout_secs),
                config.rest_api_token.clone(),
            )
            .map_err(OpenStoreError::Remote)?;
            info!(
                event_name = "store.open",
                backend = "rest",
                base_url = %config.rest_base_url,
                "opening remote customer store"
            );
            Arc::new(store)
        }
    };

    Ok(store)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clientela_core::config::{AppConfig, StoreBackend};
    use tokio::time::Instant;

    use super::open_store;
    use crate::repositories::{contract, CustomerStore};

    #[tokio::test]
    async fn local_backend_writes_under_data_dir() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let mut config = AppConfig::default().store;
        config.data_dir = dir.path().to_path_buf();
        config.slot_key = "clientes".to_string();

        let store = open_store(&config).await.expect("open local store");
        store.create(contract::fields("Ana", "Lopez", "a@x.com")).await.expect("create");

        assert!(dir.path().join("clientes.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn simulate_latency_flag_reaches_the_local_store() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let mut config = AppConfig::default().store;
        config.data_dir = dir.path().to_path_buf();
        config.simulate_latency = true;

        let store = open_store(&config).await.expect("open local store");
        let started = Instant::now();
        store.list().await.expect("list");
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn sqlite_backend_runs_migrations() {
        let mut config = AppConfig::default().store;
        config.backend = StoreBackend::Sqlite;
        config.database_url = "sqlite::memory:".to_string();
        config.max_connections = 1;

        let store = open_store(&config).await.expect("open sqlite store");
        assert!(store.list().await.expect("customer table exists").is_empty());
    }

    #[tokio::test]
    async fn rest_backend_rejects_bad_base_url() {
        let mut config = AppConfig::default().store;
        config.backend = StoreBackend::Rest;
        config.rest_base_url = "::nope::".to_string();

        assert!(open_store(&config).await.is_err());
    }
}
