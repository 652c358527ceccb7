//! Datastore implementations

pub mod memory;
pub mod sql;

pub use memory::MemoryDatastore;
pub use sql::SqlDatastore;
