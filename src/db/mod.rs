//! Data store abstraction for text2sql.
//!
//! Provides a trait-based interface for read-only statement execution, so the
//! pipeline can run against SQLite in production and in-memory doubles in tests.

mod mock;
mod sqlite;
mod types;

pub use mock::{FailingDataStore, MockDataStore};
pub use sqlite::{SqliteStore, SqliteStoreOptions};
pub use types::{ResultSet, Row, Value};

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Opens the configured data store.
///
/// This is the central factory function for data store connections.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn DataStore>> {
    let store = SqliteStore::open(SqliteStoreOptions::from(config)).await?;
    Ok(Box::new(store))
}

/// Trait defining the interface for data stores.
///
/// Implementations must be safe for concurrent use: every call acquires its
/// own connection (or equivalent) and releases it before returning.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Executes a single statement and returns the tabular result.
    async fn execute_query(&self, sql: &str) -> Result<ResultSet>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Returns a human-readable location (file path, URL) for diagnostics.
    fn location(&self) -> String;

    /// Closes the store, waiting for in-flight work to finish.
    async fn close(&self) -> Result<()>;
}
