//! HTTP error mapping.

use agentrace_replay::ReplayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Error returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown checkpoint, span or replay
    #[error("{0}")]
    NotFound(String),

    /// Malformed request
    #[error("{0}")]
    BadRequest(String),

    /// Anything else
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl From<ReplayError> for ApiError {
    fn from(err: ReplayError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else if matches!(err, ReplayError::InvalidRequest(_)) {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(msg) => {
                tracing::error!("request failed: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}
