// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::timestamp_guard::TimestampRejection;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    TimestampRejected(#[from] TimestampRejection),

    #[error("No freeze tokens available")]
    NoFreezeTokens,

    #[error("Timezone is locked")]
    TimezoneLocked,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Text generation error: {0}")]
    TextGeneration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether retrying the same storage operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Database(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::TimestampRejected(rejection) => (
                StatusCode::BAD_REQUEST,
                rejection.code(),
                Some(rejection.to_string()),
            ),
            AppError::NoFreezeTokens => (
                StatusCode::BAD_REQUEST,
                "no_freeze_tokens",
                Some(self.to_string()),
            ),
            AppError::TimezoneLocked => (
                StatusCode::CONFLICT,
                "timezone_locked",
                Some(self.to_string()),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::TextGeneration(msg) => {
                tracing::warn!(error = %msg, "Text generation provider error");
                (StatusCode::BAD_GATEWAY, "text_generation_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
