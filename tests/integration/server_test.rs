//! HTTP surface tests, driving the router directly without a socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};
use tower::ServiceExt;

use text2sql::db::MockDataStore;
use text2sql::llm::MockLlmClient;
use text2sql::query::Pipeline;
use text2sql::server::{router, AppState};

use super::common::{self, TestDatabase, EXPENSIVE_PRODUCTS, PRODUCTS};

async fn app(db: &TestDatabase, llm: MockLlmClient) -> Router {
    let llm = Arc::new(llm);
    let pipeline = common::pipeline(&llm, db.open_store().await);
    router(AppState::new(pipeline))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Json) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn post_query(sql: &str) -> Request<Body> {
    let q: String = url::form_urlencoded::byte_serialize(sql.as_bytes()).collect();
    Request::builder()
        .method(Method::POST)
        .uri(format!("/query?q={q}"))
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_text2sql_happy_path() {
    let db = TestDatabase::create().await;
    let llm = MockLlmClient::new()
        .then_reply("```sql\nSELECT COUNT(*) FROM products WHERE price > 500;\n```")
        .then_reply("Twelve products cost more than 500.");

    let body = json!({ "question": "How many products cost more than 500?" }).to_string();
    let (status, body) = send(app(&db, llm).await, post_json("/text2sql", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "sql_query": "SELECT COUNT(*) FROM products WHERE price > 500;",
            "explanation": "Twelve products cost more than 500.",
            "results": {
                "columns": ["COUNT(*)"],
                "rows": [{ "COUNT(*)": EXPENSIVE_PRODUCTS }],
                "row_count": 1
            }
        })
    );
}

#[tokio::test]
async fn test_text2sql_rows_keep_column_order() {
    let db = TestDatabase::create().await;
    let llm = MockLlmClient::new()
        .then_reply("SELECT price, name FROM products WHERE product_id = 'P001'")
        .then_reply("One product matched.");

    let body = json!({ "question": "Oak table?", "limit": 5 }).to_string();
    let (status, body) = send(app(&db, llm).await, post_json("/text2sql", body)).await;

    assert_eq!(status, StatusCode::OK);
    let row = body["results"]["rows"][0].as_object().unwrap();
    let keys: Vec<&str> = row.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["price", "name"]);
    assert_eq!(row["price"], json!(899.0));
}

#[tokio::test]
async fn test_text2sql_empty_question_is_422() {
    let db = TestDatabase::create().await;
    let body = json!({ "question": "   " }).to_string();
    let (status, body) = send(
        app(&db, MockLlmClient::new()).await,
        post_json("/text2sql", body),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_text2sql_limit_out_of_range_is_422() {
    let db = TestDatabase::create().await;
    let body = json!({ "question": "All products", "limit": 0 }).to_string();
    let (status, body) = send(
        app(&db, MockLlmClient::new()).await,
        post_json("/text2sql", body),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_text2sql_malformed_json_is_422() {
    let db = TestDatabase::create().await;
    let (status, body) = send(
        app(&db, MockLlmClient::new()).await,
        post_json("/text2sql", "{\"question\": "),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_text2sql_extraction_failure_is_400() {
    let db = TestDatabase::create().await;
    let llm = MockLlmClient::new().then_reply("```sql\n```");
    let body = json!({ "question": "Show products" }).to_string();
    let (status, body) = send(app(&db, llm).await, post_json("/text2sql", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "extraction_error");
}

#[tokio::test]
async fn test_text2sql_non_select_is_400() {
    let db = TestDatabase::create().await;
    let llm = MockLlmClient::new().then_reply("UPDATE products SET price = 0;");
    let body = json!({ "question": "Make everything free" }).to_string();
    let (status, body) = send(app(&db, llm).await, post_json("/text2sql", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert_eq!(body["message"], "Only SELECT queries are allowed.");
}

#[tokio::test]
async fn test_text2sql_execution_failure_is_400() {
    let db = TestDatabase::create().await;
    let llm = MockLlmClient::new().then_reply("SELECT * FROM orders;");
    let body = json!({ "question": "Show orders" }).to_string();
    let (status, body) = send(app(&db, llm).await, post_json("/text2sql", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "execution_error");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("SQL execution error:"));
    assert!(message.contains("orders"));
}

#[tokio::test]
async fn test_text2sql_model_failure_is_500() {
    let db = TestDatabase::create().await;
    let llm = MockLlmClient::new().then_fail("upstream unavailable");
    let body = json!({ "question": "Show products" }).to_string();
    let (status, body) = send(app(&db, llm).await, post_json("/text2sql", body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "model_error");
}

#[tokio::test]
async fn test_raw_query_returns_rows() {
    let db = TestDatabase::create().await;
    let (status, body) = send(
        app(&db, MockLlmClient::new()).await,
        post_query("SELECT product_id, name FROM products ORDER BY product_id"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_returned"], json!(PRODUCTS.len()));
    assert_eq!(
        body["data"][0],
        json!({ "product_id": "P001", "name": "Oak Dining Table" })
    );
}

#[tokio::test]
async fn test_raw_query_missing_q_is_422() {
    let db = TestDatabase::create().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/query")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&db, MockLlmClient::new()).await, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_request");
}

#[tokio::test]
async fn test_raw_query_rejects_writes() {
    let db = TestDatabase::create().await;
    let (status, body) = send(
        app(&db, MockLlmClient::new()).await,
        post_query("DROP TABLE products"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_health_reports_database() {
    let db = TestDatabase::create().await;
    let (status, body) = send(app(&db, MockLlmClient::new()).await, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db_connected"], true);
    assert_eq!(body["db_path"], json!(db.path.display().to_string()));
}

#[tokio::test]
async fn test_root_describes_service() {
    let db = TestDatabase::create().await;
    let (status, body) = send(app(&db, MockLlmClient::new()).await, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("/text2sql"));
}

#[tokio::test(start_paused = true)]
async fn test_client_disconnect_cancels_pipeline() {
    let llm = Arc::new(
        MockLlmClient::new()
            .with_delay(Duration::from_millis(300))
            .then_reply("SELECT * FROM products;")
            .then_reply("Every product."),
    );
    let store = Arc::new(MockDataStore::new());
    let app = router(AppState::new(Pipeline::new(llm.clone(), store.clone())));

    let body = json!({ "question": "Show all products" }).to_string();
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        app.oneshot(post_json("/text2sql", body)),
    )
    .await;
    assert!(outcome.is_err(), "request finished before the client left");

    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert_eq!(llm.call_count().await, 1);
    assert!(store.executed().await.is_empty());
}
