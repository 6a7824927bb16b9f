//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::crud::CrudGateway;
use crate::database;
use crate::error::{Error, Result};

/// Application state shared across handlers
///
/// Cheap to clone; use it as axum `State`.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<Config>,
    gateway: CrudGateway,
}

impl AppState {
    pub fn new(config: Config, gateway: CrudGateway) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
        }
    }

    /// Connect to the configured database and build the gateway
    ///
    /// Fails when the configuration has no `[database]` section.
    pub async fn connect(config: Config) -> Result<Self> {
        let db = config
            .database
            .as_ref()
            .ok_or_else(|| Error::Internal("no [database] section configured".to_string()))?;

        let pool = database::create_pool(db).await?;
        let gateway = CrudGateway::new(pool, db.dialect()).with_sql_logging(db.log_sql);
        Ok(Self::new(config, gateway))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &CrudGateway {
        &self.gateway
    }
}
