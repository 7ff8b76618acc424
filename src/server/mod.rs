//! HTTP surface for text2sql.
//!
//! An axum router over a shared [`Pipeline`]. Errors are returned as
//! `{kind, message}` bodies; see [`ApiError`].

mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};
pub use handlers::{HealthResponse, RawQueryResponse};

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Result, Text2SqlError};
use crate::query::Pipeline;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/text2sql", post(handlers::text2sql))
        .route("/query", post(handlers::raw_query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the router until `shutdown` is cancelled.
///
/// In-flight requests are allowed to finish before returning.
pub async fn serve(config: &ServerConfig, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| Text2SqlError::config(format!("Failed to bind {address}: {e}")))?;

    let local = listener
        .local_addr()
        .map_err(|e| Text2SqlError::internal(format!("Listener has no address: {e}")))?;
    info!("Listening on http://{}", local);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| Text2SqlError::internal(format!("Server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}
