//! Mock data stores for testing.
//!
//! Provide in-memory implementations that record the statements they receive.

use super::{DataStore, ResultSet};
use crate::error::{Result, Text2SqlError};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A mock data store that returns a predefined result set.
#[derive(Debug, Default)]
pub struct MockDataStore {
    result: ResultSet,
    executed: Mutex<Vec<String>>,
}

impl MockDataStore {
    /// Creates a mock store that returns an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock store that returns the given result for every statement.
    pub fn with_result(result: ResultSet) -> Self {
        Self {
            result,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Returns every statement executed so far, in order.
    pub async fn executed(&self) -> Vec<String> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl DataStore for MockDataStore {
    async fn execute_query(&self, sql: &str) -> Result<ResultSet> {
        self.executed.lock().await.push(sql.to_string());
        Ok(self.result.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn location(&self) -> String {
        "mock".to_string()
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A data store whose every operation fails with an engine-style message.
#[derive(Debug)]
pub struct FailingDataStore {
    message: String,
    executed: Mutex<Vec<String>>,
}

impl FailingDataStore {
    /// Creates a store that fails with the given engine message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Returns every statement attempted so far.
    pub async fn executed(&self) -> Vec<String> {
        self.executed.lock().await.clone()
    }
}

#[async_trait]
impl DataStore for FailingDataStore {
    async fn execute_query(&self, sql: &str) -> Result<ResultSet> {
        self.executed.lock().await.push(sql.to_string());
        Err(Text2SqlError::execution(self.message.clone()))
    }

    async fn ping(&self) -> Result<()> {
        Err(Text2SqlError::connection(self.message.clone()))
    }

    fn location(&self) -> String {
        "failing".to_string()
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
