//! End-to-end pipeline tests against a real SQLite file.
//!
//! The model is scripted; extraction, gate and execution are real.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use text2sql::db::{DataStore, Value};
use text2sql::error::Text2SqlError;
use text2sql::llm::MockLlmClient;
use text2sql::query::{fallback_explanation, QueryRequest};
use text2sql::safety::{Rejection, SafetyGate};

use super::common::{self, TestDatabase, EXPENSIVE_PRODUCTS, PRODUCTS};

#[tokio::test]
async fn test_fenced_count_query_end_to_end() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(
        MockLlmClient::new()
            .then_reply("```sql\nSELECT COUNT(*) FROM products WHERE price > 500;\n```")
            .then_reply("There are 12 products priced above 500."),
    );
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let response = pipeline
        .answer(
            &QueryRequest::new("How many products cost more than 500?"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.sql_query,
        "SELECT COUNT(*) FROM products WHERE price > 500;"
    );
    assert_eq!(response.results.columns, vec!["COUNT(*)".to_string()]);
    assert_eq!(response.results.row_count, 1);
    assert_eq!(
        response.results.rows[0].get("COUNT(*)"),
        Some(&Value::Int(EXPENSIVE_PRODUCTS))
    );
    assert_eq!(
        response.explanation,
        "There are 12 products priced above 500."
    );

    let calls = llm.calls().await;
    assert_eq!(calls.len(), 2);
    let explanation_prompt = &calls[1].last().unwrap().content;
    assert!(explanation_prompt.contains(
        "Found 1 result.\nColumns: COUNT(*)\nSample data (first 1 row):\nRow 1: {'COUNT(*)': 12}"
    ));
    assert!(explanation_prompt
        .contains("SQL query executed: SELECT COUNT(*) FROM products WHERE price > 500;"));
}

#[tokio::test]
async fn test_prose_wrapped_sql_is_extracted() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(MockLlmClient::new().then_reply(
        "Here's the SQL: SELECT * FROM products; This query returns every product.",
    ));
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let response = pipeline
        .answer(&QueryRequest::new("Show all products"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.sql_query, "SELECT * FROM products;");
    assert_eq!(response.results.row_count, PRODUCTS.len());
    assert_eq!(response.results.columns.len(), 6);
    assert_eq!(response.results.columns[0], "product_id");
}

#[tokio::test]
async fn test_request_limit_caps_rows() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(
        MockLlmClient::new().then_reply("SELECT name, price FROM products ORDER BY price DESC"),
    );
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let response = pipeline
        .answer(
            &QueryRequest::new("Most expensive products").with_limit(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.results.row_count, 3);
    assert_eq!(
        response.results.rows[0].get("name"),
        Some(&Value::String("Sectional Sofa".to_string()))
    );
    assert_eq!(
        response.sql_query,
        "SELECT name, price FROM products ORDER BY price DESC;"
    );
}

#[tokio::test]
async fn test_empty_result_explains_no_rows() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(
        MockLlmClient::new()
            .then_reply("SELECT * FROM products WHERE price > 100000;")
            .then_fail("service unavailable"),
    );
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let response = pipeline
        .answer(&QueryRequest::new("Anything over 100k?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.results.row_count, 0);
    assert_eq!(response.results.columns.len(), 6);
    assert_eq!(response.explanation, fallback_explanation(0));
    let calls = llm.calls().await;
    assert!(calls[1].last().unwrap().content.contains("No results found."));
}

#[tokio::test]
async fn test_empty_model_reply_is_extraction_error() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(MockLlmClient::new().then_reply(""));
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let err = pipeline
        .answer(&QueryRequest::new("Show all products"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Text2SqlError::Extraction(_)));
    assert_eq!(llm.call_count().await, 1);
}

#[tokio::test]
async fn test_unknown_column_is_execution_error() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(MockLlmClient::new().then_reply("SELECT colour FROM products;"));
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let err = pipeline
        .answer(&QueryRequest::new("What colours exist?"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Text2SqlError::Execution(_)));
    assert!(err.to_string().starts_with("SQL execution error:"));
    assert!(err.to_string().contains("colour"));
    assert_eq!(llm.call_count().await, 1);
}

#[tokio::test]
async fn test_explanation_failure_uses_fallback() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(
        MockLlmClient::new()
            .then_reply("SELECT category_name FROM categories;")
            .then_fail("rate limited"),
    );
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let response = pipeline
        .answer(&QueryRequest::new("List categories"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.results.row_count, 5);
    assert_eq!(
        response.explanation,
        "Query executed successfully. Found 5 results."
    );
}

#[tokio::test]
async fn test_delete_is_rejected_and_data_unchanged() {
    let db = TestDatabase::create().await;
    let store = db.open_store().await;
    let llm = Arc::new(MockLlmClient::new().then_reply("DELETE FROM products;"));
    let pipeline = common::pipeline(&llm, store.clone());

    let err = pipeline
        .answer(&QueryRequest::new("Remove everything"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Text2SqlError::Validation(Rejection::NotSelect)));
    assert_eq!(llm.call_count().await, 1);

    let count = store
        .execute_query("SELECT COUNT(*) AS n FROM products")
        .await
        .unwrap();
    assert_eq!(
        count.rows[0].get("n"),
        Some(&Value::Int(PRODUCTS.len() as i64))
    );
}

#[tokio::test]
async fn test_stacked_statements_are_rejected() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(
        MockLlmClient::new().then_reply("SELECT * FROM products; DROP TABLE products;"),
    );
    let pipeline = common::pipeline(&llm, db.open_store().await);

    let err = pipeline
        .answer(&QueryRequest::new("Show products"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Text2SqlError::Validation(Rejection::MultipleStatements)
    ));
}

#[tokio::test]
async fn test_strict_gate_end_to_end() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(
        MockLlmClient::new()
            .then_reply("SELECT p.name FROM products p JOIN categories c ON p.category = c.category_name WHERE c.category_name = 'Office';"),
    );
    let pipeline = common::pipeline(&llm, db.open_store().await).with_gate(SafetyGate::strict());

    let response = pipeline
        .answer(&QueryRequest::new("Office furniture"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.results.row_count, 2);
}

#[tokio::test]
async fn test_run_sql_skips_model_and_limit() {
    let db = TestDatabase::create().await;
    let llm = Arc::new(MockLlmClient::new());
    let pipeline = common::pipeline(&llm, db.open_store().await).with_default_limit(2);

    let results = pipeline
        .run_sql("SELECT product_id FROM products", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.row_count, PRODUCTS.len());
    assert_eq!(llm.call_count().await, 0);
}
