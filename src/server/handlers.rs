//! Route handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::db::Row;
use crate::error::Text2SqlError;
use crate::query::{PipelineResponse, QueryRequest};

use super::error::ApiError;
use super::AppState;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Query string of `POST /query`.
#[derive(Debug, Deserialize)]
pub struct RawQueryParams {
    pub q: String,
}

/// Body of a successful `POST /query`.
#[derive(Debug, Serialize)]
pub struct RawQueryResponse {
    pub rows_returned: usize,
    pub data: Vec<Row>,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_connected: bool,
    pub db_path: String,
}

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "text2sql is running. POST /text2sql with {\"question\": \"...\"} to ask a question, \
                  or POST /query?q=<SELECT ...> to run read-only SQL.",
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.pipeline.store();
    Json(HealthResponse {
        status: "ok",
        db_connected: store.ping().await.is_ok(),
        db_path: store.location(),
    })
}

/// `POST /text2sql`
///
/// The pipeline runs in its own task; if the client disconnects, dropping this
/// handler cancels the task's token.
pub async fn text2sql(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<PipelineResponse> {
    let Json(request) = payload.map_err(|e| Text2SqlError::invalid_request(e.body_text()))?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let pipeline = state.pipeline.clone();

    let task = tokio::spawn(async move { pipeline.answer(&request, &cancel).await });
    let response = task
        .await
        .map_err(|e| Text2SqlError::internal(format!("Pipeline task failed: {e}")))??;

    Ok(Json(response))
}

/// `POST /query?q=<sql>`
pub async fn raw_query(
    State(state): State<AppState>,
    params: std::result::Result<Query<RawQueryParams>, QueryRejection>,
) -> ApiResult<RawQueryResponse> {
    let Query(params) = params.map_err(|e| Text2SqlError::invalid_request(e.body_text()))?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let pipeline = state.pipeline.clone();

    let task = tokio::spawn(async move { pipeline.run_sql(&params.q, &cancel).await });
    let results = task
        .await
        .map_err(|e| Text2SqlError::internal(format!("Query task failed: {e}")))??;

    Ok(Json(RawQueryResponse {
        rows_returned: results.row_count,
        data: results.rows,
    }))
}
