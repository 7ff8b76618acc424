//! SQLite store tests: read-only enforcement, typing and pooled access.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use text2sql::config::DatabaseConfig;
use text2sql::db::{self, DataStore, SqliteStore, SqliteStoreOptions, Value};
use text2sql::error::Text2SqlError;

use super::common::{TestDatabase, PRODUCTS};

#[tokio::test]
async fn test_missing_file_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = SqliteStore::open(SqliteStoreOptions::new(dir.path().join("absent.db"))).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Text2SqlError::Connection(_)));
    assert!(err.to_string().contains("absent.db"));
    assert!(!dir.path().join("absent.db").exists());
}

#[tokio::test]
async fn test_connect_from_config() {
    let db = TestDatabase::create().await;
    let config = DatabaseConfig {
        path: db.path.clone(),
        ..DatabaseConfig::default()
    };

    let store = db::connect(&config).await.unwrap();
    store.ping().await.unwrap();
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_values_keep_storage_types() {
    let db = TestDatabase::create().await;
    let store = db.open_store().await;

    let result = store
        .execute_query(
            "SELECT product_id, price, stock_quantity, NULL AS notes FROM products WHERE product_id = 'P002'",
        )
        .await
        .unwrap();

    assert_eq!(
        result.columns,
        vec!["product_id", "price", "stock_quantity", "notes"]
    );
    let row = &result.rows[0];
    assert_eq!(row.get("product_id"), Some(&Value::String("P002".to_string())));
    assert_eq!(row.get("price"), Some(&Value::Float(1499.0)));
    assert_eq!(row.get("stock_quantity"), Some(&Value::Int(2)));
    assert_eq!(row.get("notes"), Some(&Value::Null));
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let db = TestDatabase::create().await;
    let store = db.open_store().await;

    let result = store
        .execute_query("SELECT name, price FROM products WHERE 1 = 0")
        .await
        .unwrap();

    assert_eq!(result.row_count, 0);
    assert_eq!(result.columns, vec!["name", "price"]);
}

#[tokio::test]
async fn test_writes_fail_at_the_connection() {
    let db = TestDatabase::create().await;
    let store = db.open_store().await;

    let err = store
        .execute_query("INSERT INTO categories (category_name) VALUES ('Garden')")
        .await
        .unwrap_err();
    assert!(matches!(err, Text2SqlError::Execution(_)));

    let result = store
        .execute_query("SELECT COUNT(*) AS n FROM categories")
        .await
        .unwrap();
    assert_eq!(result.rows[0].get("n"), Some(&Value::Int(5)));
}

#[tokio::test]
async fn test_concurrent_queries_share_the_pool() {
    let db = TestDatabase::create().await;
    let store: Arc<dyn DataStore> = db.open_store().await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let id = format!("P{:03}", i % PRODUCTS.len() + 1);
                store
                    .execute_query(&format!(
                        "SELECT name FROM products WHERE product_id = '{id}'"
                    ))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.row_count, 1);
    }

    store.close().await.unwrap();
}
