//! Application state management

use crate::config::AppConfig;
use crate::db::seed::seed_sample_data;
use crate::db::Stores;
use crate::error::Result;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Backends selected at startup
    pub stores: Stores,

    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Open the configured stores and seed them when asked to
    pub fn new(config: AppConfig) -> Result<Self> {
        let stores = Stores::from_config(&config.store)?;

        if config.seed_sample_data {
            seed_sample_data(&stores)?;
        }

        Ok(Self::with_stores(stores, config))
    }

    pub fn with_stores(stores: Stores, config: AppConfig) -> Self {
        Self {
            stores,
            config: Arc::new(config),
        }
    }
}
