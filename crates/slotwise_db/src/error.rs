//! Error types for the datastore

use slotwise_common::SlotwiseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Database configuration error: {0}")]
    ConfigError(String),

    #[error("Database URL error: {0}")]
    UrlError(String),

    #[error("Database pool error: {0}")]
    PoolError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database transaction error: {0}")]
    TransactionError(String),

    /// A stored value could not be turned back into a domain type.
    #[error("Corrupt row in {table}: {message}")]
    DecodeError { table: &'static str, message: String },

    /// Raised by the in-memory store when failure injection is on.
    #[error("Datastore unavailable")]
    Unavailable,
}

impl From<DbError> for SlotwiseError {
    fn from(err: DbError) -> Self {
        SlotwiseError::Storage(err.to_string())
    }
}
