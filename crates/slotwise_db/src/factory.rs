//! Builds the datastore the backend runs on
//!
//! A configured `database` section yields the SQL store; without one the
//! service runs on the in-memory store.

use crate::client::DbClient;
use crate::datastore::Datastore;
use crate::error::DbError;
use crate::repositories::{MemoryDatastore, SqlDatastore};
use slotwise_config::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct DatastoreFactory;

impl DatastoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Connect and initialise the schema.
    ///
    /// # Errors
    ///
    /// Fails when a database is configured but cannot be reached.
    pub async fn from_app_config(&self, config: &AppConfig) -> Result<Arc<dyn Datastore>, DbError> {
        match config.database.as_ref() {
            Some(db_config) => {
                let client = DbClient::from_config(db_config).await?;
                info!("Using SQL datastore at {}", db_config.url);
                let store = SqlDatastore::new(client);
                store.init_schema().await?;
                Ok(Arc::new(store))
            }
            None => {
                warn!("No database configured; using the in-memory datastore");
                Ok(Arc::new(MemoryDatastore::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwise_config::DatabaseConfig;

    #[tokio::test]
    async fn falls_back_to_memory_without_database() {
        let config = AppConfig::default();
        let store = DatastoreFactory::new().from_app_config(&config).await.unwrap();
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn builds_sql_store_from_config() {
        let config = AppConfig {
            database: Some(DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            }),
            ..AppConfig::default()
        };
        let store = DatastoreFactory::new().from_app_config(&config).await.unwrap();
        assert!(store.list_services(uuid::Uuid::new_v4()).await.unwrap().is_empty());
    }
}
