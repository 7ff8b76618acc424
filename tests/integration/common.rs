//! Shared fixtures: a seeded furniture database and pipeline builders.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tempfile::TempDir;

use text2sql::db::{DataStore, SqliteStore, SqliteStoreOptions};
use text2sql::llm::MockLlmClient;
use text2sql::query::Pipeline;

/// Rows seeded into `products`: (id, name, category, material, price, stock).
pub const PRODUCTS: &[(&str, &str, &str, &str, f64, i64)] = &[
    ("P001", "Oak Dining Table", "Dining Room", "Oak", 899.0, 4),
    ("P002", "Leather Sofa", "Living Room", "Leather", 1499.0, 2),
    ("P003", "Walnut Bookshelf", "Storage", "Walnut", 649.0, 7),
    ("P004", "Glass Coffee Table", "Living Room", "Glass", 529.0, 3),
    ("P005", "King Bed Frame", "Bedroom", "Pine", 1199.0, 5),
    ("P006", "Office Desk", "Office", "Steel", 749.0, 9),
    ("P007", "Ergonomic Chair", "Office", "Fabric", 579.0, 12),
    ("P008", "Wardrobe", "Bedroom", "Oak", 1099.0, 1),
    ("P009", "Sideboard", "Dining Room", "Walnut", 949.0, 6),
    ("P010", "Sectional Sofa", "Living Room", "Fabric", 1899.0, 2),
    ("P011", "Storage Cabinet", "Storage", "Steel", 599.0, 8),
    ("P012", "Dresser", "Bedroom", "Pine", 689.0, 4),
    ("P013", "Side Table", "Living Room", "Pine", 129.0, 20),
    ("P014", "Bar Stool", "Dining Room", "Steel", 89.0, 30),
];

/// Products priced above 500.
pub const EXPENSIVE_PRODUCTS: i64 = 12;

/// A seeded database living as long as the returned directory.
pub struct TestDatabase {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestDatabase {
    /// Creates `furniture.db` with `products` and `categories` tables.
    pub async fn create() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("furniture.db");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();

        sqlx::query(
            "CREATE TABLE categories (
                category_name TEXT PRIMARY KEY,
                description TEXT
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE products (
                product_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL REFERENCES categories(category_name),
                material TEXT,
                price REAL NOT NULL,
                stock_quantity INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        for category in ["Bedroom", "Dining Room", "Living Room", "Office", "Storage"] {
            sqlx::query("INSERT INTO categories (category_name, description) VALUES (?, NULL)")
                .bind(category)
                .execute(&pool)
                .await
                .unwrap();
        }

        for (id, name, category, material, price, stock) in PRODUCTS {
            sqlx::query(
                "INSERT INTO products (product_id, name, category, material, price, stock_quantity)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(name)
            .bind(category)
            .bind(material)
            .bind(price)
            .bind(stock)
            .execute(&pool)
            .await
            .unwrap();
        }

        pool.close().await;
        Self { dir, path }
    }

    /// Opens the database through the read-only store.
    pub async fn open_store(&self) -> Arc<SqliteStore> {
        Arc::new(
            SqliteStore::open(SqliteStoreOptions::new(&self.path))
                .await
                .unwrap(),
        )
    }
}

/// Builds a pipeline over the store with the given mock model.
pub fn pipeline(llm: &Arc<MockLlmClient>, store: Arc<dyn DataStore>) -> Pipeline {
    Pipeline::new(llm.clone(), store)
}
