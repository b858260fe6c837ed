//! API Error Handling
//!
//! Error-to-response conversion. Bodies are plain text, matching the
//! service's text-based wire contract.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unauthorized(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        (status, message).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
