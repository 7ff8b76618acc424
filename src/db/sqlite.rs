//! SQLite data store implementation.
//!
//! Provides the `SqliteStore` struct that implements the `DataStore` trait for
//! a single-file SQLite database using a read-only sqlx connection pool.

use crate::config::DatabaseConfig;
use crate::db::{DataStore, ResultSet, Row, Value};
use crate::error::{Result, Text2SqlError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long a connection waits on a locked database file.
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Options for opening a [`SqliteStore`].
#[derive(Debug, Clone)]
pub struct SqliteStoreOptions {
    /// Path to the database file.
    pub path: PathBuf,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,
    /// Deadline for a single statement.
    pub query_timeout: Duration,
}

impl SqliteStoreOptions {
    /// Creates options for the given file with default pool settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from(&DatabaseConfig {
            path: path.into(),
            ..DatabaseConfig::default()
        })
    }
}

impl From<&DatabaseConfig> for SqliteStoreOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            path: config.path.clone(),
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
        }
    }
}

/// SQLite data store backed by a read-only connection pool.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    path: PathBuf,
    query_timeout: Duration,
}

impl SqliteStore {
    /// Opens the database file read-only.
    ///
    /// The file must already exist; the store never creates or writes it.
    pub async fn open(options: SqliteStoreOptions) -> Result<Self> {
        if !options.path.exists() {
            return Err(Text2SqlError::connection(format!(
                "Database file not found: {}",
                options.path.display()
            )));
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&options.path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                Text2SqlError::connection(format!(
                    "Failed to open {}: {e}",
                    options.path.display()
                ))
            })?;

        info!(
            "Opened SQLite database at {} (read-only, {} connections)",
            options.path.display(),
            options.max_connections
        );

        Ok(Self {
            pool,
            path: options.path,
            query_timeout: options.query_timeout,
        })
    }

    /// Creates a store from an existing pool.
    ///
    /// This is primarily useful for testing.
    pub fn from_pool(pool: SqlitePool, path: impl Into<PathBuf>, query_timeout: Duration) -> Self {
        Self {
            pool,
            path: path.into(),
            query_timeout,
        }
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepares and runs the statement on one pooled connection.
    ///
    /// Column names come from the prepared statement so empty results keep
    /// their schema.
    async fn run(&self, sql: &str) -> Result<(Vec<String>, Vec<SqliteRow>)> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Text2SqlError::connection(format!("Failed to acquire database connection: {e}"))
        })?;

        let statement = (&mut *conn).prepare(sql).await.map_err(map_query_error)?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect();

        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_query_error)?;

        Ok((columns, rows))
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn execute_query(&self, sql: &str) -> Result<ResultSet> {
        let start = Instant::now();

        let (columns, rows) = tokio::time::timeout(self.query_timeout, self.run(sql))
            .await
            .map_err(|_| {
                Text2SqlError::timeout(format!(
                    "Query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })??;

        let rows: Vec<Row> = rows.iter().map(|row| convert_row(&columns, row)).collect();

        debug!(
            "Query returned {} rows in {:?}",
            rows.len(),
            start.elapsed()
        );

        Ok(ResultSet::with_data(columns, rows))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1;")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| Text2SqlError::connection(format!("Database unreachable: {e}")))
    }

    fn location(&self) -> String {
        std::path::absolute(&self.path)
            .unwrap_or_else(|_| self.path.clone())
            .display()
            .to_string()
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts engine errors, keeping SQLite's own message for statement errors.
fn map_query_error(error: sqlx::Error) -> Text2SqlError {
    match error {
        sqlx::Error::Database(db_error) => Text2SqlError::execution(db_error.message()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            Text2SqlError::connection(error.to_string())
        }
        other => Text2SqlError::execution(other.to_string()),
    }
}

/// Converts a SQLite row into a column-ordered [`Row`].
fn convert_row(columns: &[String], row: &SqliteRow) -> Row {
    let mut converted = Row::new();
    for (idx, name) in columns.iter().enumerate() {
        converted.push(name.as_str(), convert_value(row, idx));
    }
    converted
}

/// Decodes a cell by its runtime storage class.
fn convert_value(row: &SqliteRow, idx: usize) -> Value {
    let raw = match row.try_get_raw(idx) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read column {}: {}", idx, e);
            return Value::Null;
        }
    };

    if raw.is_null() {
        return Value::Null;
    }

    let decoded = match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(idx).map(Value::Int),
        "REAL" | "NUMERIC" => row.try_get::<f64, _>(idx).map(Value::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(idx).map(Value::Bytes),
        _ => row.try_get::<String, _>(idx).map(Value::String),
    };

    decoded.unwrap_or_else(|e| {
        warn!("Failed to decode column {}: {}", idx, e);
        Value::Null
    })
}
