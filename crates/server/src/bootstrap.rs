use std::sync::Arc;

use axum::Router;
use clientela_core::config::{AppConfig, ConfigError, LoadOptions};
use clientela_db::{open_store, CustomerStore, OpenStoreError};
use thiserror::Error;
use tracing::info;

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn CustomerStore>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] OpenStoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        backend = ?config.store.backend,
        "starting application bootstrap"
    );

    let store = open_store(&config.store).await?;
    info!(
        event_name = "system.bootstrap.store_opened",
        correlation_id = "bootstrap",
        "customer store ready"
    );

    Ok(Application { config, store })
}

impl Application {
    pub fn router(&self) -> Router {
        api::router(Arc::clone(&self.store)).merge(health::router(Arc::clone(&self.store)))
    }
}
