//! Response envelope and error taxonomy for the HTTP Query API.
//!
//! Every handler returns `Result<ApiResponse<T>, ApiError>`. `ApiError`
//! implements `IntoResponse` so handlers can use `?` and still produce the
//! `{success, status_code, message, data?, error?}` envelope on failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Uniform response envelope wrapping successful handler output.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            status_code: StatusCode::OK.as_u16(),
            message: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn created(data: T) -> (StatusCode, Self) {
        (
            StatusCode::CREATED,
            Self {
                success: true,
                status_code: StatusCode::CREATED.as_u16(),
                message: "created".to_string(),
                data: Some(data),
            },
        )
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Error taxonomy for the Control Plane and HTTP layer.
///
/// Maps directly onto the error-codes table: validation and not-found are
/// client errors (400/404); database and workflow-substrate failures are
/// server errors (500).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("workflow substrate error: {0}")]
    Workflow(#[from] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Workflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    status_code: u16,
    message: String,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, status = status.as_u16(), "request failed");
        let body = ErrorEnvelope {
            success: false,
            status_code: status.as_u16(),
            message: "request failed".to_string(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
