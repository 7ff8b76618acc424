//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::Text2SqlError;

/// Body sent with every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

/// A [`Text2SqlError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub Text2SqlError);

impl ApiError {
    /// Returns the HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Text2SqlError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Text2SqlError::Extraction(_)
            | Text2SqlError::Validation(_)
            | Text2SqlError::Execution(_) => StatusCode::BAD_REQUEST,
            Text2SqlError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Text2SqlError::Cancelled | Text2SqlError::Connection(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Text2SqlError::Llm(_) | Text2SqlError::Config(_) | Text2SqlError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Text2SqlError> for ApiError {
    fn from(error: Text2SqlError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_client_error() {
            warn!("Request failed: {}: {}", self.0.category(), self.0);
        } else {
            error!("Request failed: {}: {}", self.0.category(), self.0);
        }

        let body = ErrorBody {
            kind: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
