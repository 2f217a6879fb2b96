//! API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Chain error.
    #[error("Chain error: {0}")]
    Chain(#[from] pocx_chain::ChainError),

    /// Consensus error.
    #[error("Consensus error: {0}")]
    Consensus(#[from] pocx_consensus::ConsensusError),

    /// Assignment error.
    #[error("Assignment error: {0}")]
    Assignment(#[from] pocx_assignments::AssignmentError),
}

/// Error response body.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub error: u16,
    /// Short reason.
    pub reason: String,
    /// Human-readable detail.
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ApiError::BadRequest(_) | ApiError::Consensus(_) | ApiError::Assignment(_) => {
                (StatusCode::BAD_REQUEST, "Bad Request")
            }
            ApiError::Internal(_) | ApiError::Chain(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };
        let body = ErrorResponse {
            error: status.as_u16(),
            reason: reason.to_string(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
