//! Database client
//!
//! A thin wrapper over a SQLx `Any` pool so the SQL datastore does not care
//! which driver backs it.

use crate::error::DbError;
use slotwise_config::{AppConfig, DatabaseConfig};
use sqlx::pool::PoolOptions;
use sqlx::{Pool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

pub type DbTransaction<'a> = Transaction<'a, sqlx::Any>;

#[derive(Debug, Clone)]
pub struct DbClient {
    pool: Pool<sqlx::Any>,
}

impl DbClient {
    /// Create a client from the `database` section of the app config.
    ///
    /// # Errors
    ///
    /// Fails when the section is missing or the pool cannot connect.
    pub async fn new(config: &AppConfig) -> Result<Self, DbError> {
        let db_config = config
            .database
            .as_ref()
            .ok_or_else(|| DbError::ConfigError("Database configuration is missing".to_string()))?;

        Self::from_config(db_config).await
    }

    pub async fn from_config(db_config: &DatabaseConfig) -> Result<Self, DbError> {
        if db_config.url.is_empty() {
            return Err(DbError::ConfigError("Database URL is empty".to_string()));
        }
        let pool = Self::create_pool(&db_config.url, db_config.max_connections).await?;
        Ok(Self { pool })
    }

    /// In-memory SQLite on a single connection, so every query sees the same database.
    pub async fn in_memory() -> Result<Self, DbError> {
        let pool = Self::create_pool("sqlite::memory:", 1).await?;
        Ok(Self { pool })
    }

    async fn create_pool(db_url: &str, max_connections: u32) -> Result<Pool<sqlx::Any>, DbError> {
        debug!("Creating database pool with URL: {}", db_url);

        sqlx::any::install_default_drivers();

        let in_memory = db_url.contains(":memory:");
        let mut pool_options = PoolOptions::<sqlx::Any>::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(3));
        pool_options = if in_memory {
            // Dropping the last connection drops the database.
            pool_options.min_connections(1).idle_timeout(None::<Duration>).max_lifetime(None::<Duration>)
        } else {
            pool_options.idle_timeout(Duration::from_secs(600))
        };

        if let Some(db_path) = db_url
            .strip_prefix("sqlite://")
            .or_else(|| db_url.strip_prefix("sqlite:"))
        {
            let db_path = db_path.split('?').next().unwrap_or(db_path);
            if !in_memory && !db_path.is_empty() {
                Self::ensure_sqlite_file(db_path)?;
            }
        }

        let options = sqlx::any::AnyConnectOptions::from_str(db_url)
            .map_err(|e| DbError::UrlError(e.to_string()))?;
        let pool = pool_options.connect_with(options).await.map_err(|e| {
            error!("Failed to create database pool: {}", e);
            DbError::PoolError(e.to_string())
        })?;

        info!("Database pool created successfully");
        Ok(pool)
    }

    fn ensure_sqlite_file(db_path: &str) -> Result<(), DbError> {
        let path = std::path::Path::new(db_path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                debug!("Creating directory for SQLite database: {:?}", dir);
                std::fs::create_dir_all(dir)
                    .map_err(|e| DbError::PoolError(format!("Failed to create directory: {}", e)))?;
            }
        }
        if !path.exists() {
            debug!("Creating empty SQLite database file: {}", db_path);
            std::fs::File::create(path)
                .map_err(|e| DbError::PoolError(format!("Failed to create database file: {}", e)))?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &Pool<sqlx::Any> {
        &self.pool
    }

    pub async fn begin(&self) -> Result<DbTransaction<'_>, DbError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }

    /// Execute a statement that returns no rows; yields the affected row count.
    pub async fn execute(&self, query: &str) -> Result<u64, DbError> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| DbError::QueryError(e.to_string()))
    }

    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

impl std::fmt::Display for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbClient")
    }
}
