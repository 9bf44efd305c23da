//! Error types for SellerScope services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Resource errors (4xxx)
    NotFound,
    UserNotFound,
    LogEntryNotFound,

    // Throughput errors (6xxx)
    QueueSaturated,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    CrawlError,
    CrawlNotReady,
    EmptyDataset,
    QueueError,
    NotifyError,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::NotFound => 4001,
            ErrorCode::UserNotFound => 4002,
            ErrorCode::LogEntryNotFound => 4003,

            ErrorCode::QueueSaturated => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::CrawlError => 8001,
            ErrorCode::CrawlNotReady => 8002,
            ErrorCode::EmptyDataset => 8003,
            ErrorCode::QueueError => 8004,
            ErrorCode::NotifyError => 8005,
            ErrorCode::UpstreamError => 8006,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("User not found: chat #{chat_id}")]
    UserNotFound { chat_id: i64 },

    #[error("Log entry not found: {id}")]
    LogEntryNotFound { id: String },

    // Crawl queue pressure: more jobs queued than the submission threshold allows
    #[error("Crawl queue saturated: {pending} pending + {running} running exceeds threshold {threshold}")]
    QueueSaturated {
        pending: u64,
        running: u64,
        threshold: u64,
    },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Crawl backend error: {message}")]
    Crawl { message: String },

    #[error("Crawl job not finished yet: {job_key}")]
    CrawlNotReady { job_key: String },

    #[error("Crawl result is empty or malformed")]
    EmptyDataset,

    #[error("Task queue error: {message}")]
    Queue { message: String },

    #[error("Notifier error: {message}")]
    Notify { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::UserNotFound { .. } => ErrorCode::UserNotFound,
            AppError::LogEntryNotFound { .. } => ErrorCode::LogEntryNotFound,
            AppError::QueueSaturated { .. } => ErrorCode::QueueSaturated,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Crawl { .. } => ErrorCode::CrawlError,
            AppError::CrawlNotReady { .. } => ErrorCode::CrawlNotReady,
            AppError::EmptyDataset => ErrorCode::EmptyDataset,
            AppError::Queue { .. } => ErrorCode::QueueError,
            AppError::Notify { .. } => ErrorCode::NotifyError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::UserNotFound { .. }
            | AppError::LogEntryNotFound { .. } => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            AppError::QueueSaturated { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Crawl { .. }
            | AppError::CrawlNotReady { .. }
            | AppError::EmptyDataset
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::Queue { .. } | AppError::Notify { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for HTTP endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                request_id: None, // Should be filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::UserNotFound { chat_id: 383716 };
        assert_eq!(err.code(), ErrorCode::UserNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_queue_saturated_is_client_error() {
        let err = AppError::QueueSaturated {
            pending: 2,
            running: 10,
            threshold: 1,
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_crawl_not_ready_is_distinguished() {
        let err = AppError::CrawlNotReady {
            job_key: "414324/1/356".into(),
        };
        assert_eq!(err.code(), ErrorCode::CrawlNotReady);
        assert!(matches!(err, AppError::CrawlNotReady { .. }));
    }
}
