use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::RagError;

/// A pipeline failure rendered as `{"error": {"type", "message"}}`.
#[derive(Debug)]
pub struct ApiError(pub RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(RagError::invalid(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(RagError::invalid(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(RagError::invalid(rejection.body_text()))
    }
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            RagError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            RagError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            RagError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_error"),
            RagError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
