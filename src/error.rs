//! Error types for the meter service
//!
//! This module defines custom error types used throughout the application.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access forbidden")]
    Forbidden,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        message: String,
        limit: u64,
        used: u64,
        reset_at: String,
    },

    #[error("Usage unavailable: {0}")]
    UsageUnavailable(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Additional error details for quota rejections
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub limit: u64,
    pub used: u64,
    pub reset_at: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                self.to_string(),
                None,
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                self.to_string(),
                None,
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::QuotaExceeded {
                message,
                limit,
                used,
                reset_at,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "QUOTA_EXCEEDED",
                message.clone(),
                Some(ErrorDetails {
                    limit: *limit,
                    used: *used,
                    reset_at: reset_at.clone(),
                }),
            ),
            AppError::UsageUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "USAGE_UNAVAILABLE",
                "Usage is temporarily unavailable".to_string(),
                None,
            ),
            AppError::UpstreamError(msg) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                msg.clone(),
                None,
            ),
            AppError::RedisError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                "Store service error".to_string(),
                None,
            ),
            AppError::HttpError(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "Upstream service error".to_string(),
                None,
            ),
            AppError::JsonError(_) => (
                StatusCode::BAD_REQUEST,
                "INVALID_JSON",
                "Invalid JSON in request".to_string(),
                None,
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
