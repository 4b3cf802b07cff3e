//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ouilookup_core::constants::{INTERNAL_ERROR_MESSAGE, NOT_FOUND_MESSAGE, USAGE_HINT};
use ouilookup_core::error::OuiError;

use crate::dto::LookupResponse;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Internal server error. The detail stays in the logs.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(LookupResponse::error(self.message))).into_response()
    }
}

impl From<OuiError> for ApiError {
    fn from(err: OuiError) -> Self {
        match &err {
            OuiError::MalformedAddress(_) => ApiError::bad_request(format!("{}. {}", err, USAGE_HINT)),
            OuiError::NotFound => ApiError::not_found(NOT_FOUND_MESSAGE),
            _ => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal()
            }
        }
    }
}
