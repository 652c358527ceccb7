//! Datastore access for Slotwise
//!
//! Every component talks to storage through the [`Datastore`] trait. Two
//! implementations ship with the crate:
//!
//! - [`SqlDatastore`], backed by a SQLx `Any` pool (SQLite by default)
//! - [`MemoryDatastore`], used when no database is configured and in tests
//!
//! ```rust,no_run
//! use slotwise_config::AppConfig;
//! use slotwise_db::DatastoreFactory;
//!
//! async fn setup(config: &AppConfig) -> Result<(), slotwise_db::DbError> {
//!     let store = DatastoreFactory::new().from_app_config(config).await?;
//!     store.ping().await
//! }
//! ```

pub mod client;
pub mod datastore;
pub mod error;
pub mod factory;
pub mod repositories;

pub use client::{DbClient, DbTransaction};
pub use datastore::Datastore;
pub use error::DbError;
pub use factory::DatastoreFactory;
pub use repositories::{MemoryDatastore, SqlDatastore};
