//! Error types for MedQA services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling
//!
//! Expected engine outcomes (entity not found, unsupported intent, empty
//! result) are not errors. They are modelled as result variants in
//! [`crate::kgqa`]. Only infrastructure failures travel through [`AppError`].

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
    MissingField,
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,

    // Graph store errors (7xxx)
    GraphUnavailable,
    GraphTimeout,

    // External service errors (8xxx)
    UpstreamError,
    UpstreamTimeout,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,

            // Graph store (7xxx)
            ErrorCode::GraphUnavailable => 7001,
            ErrorCode::GraphTimeout => 7002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamTimeout => 8002,

            // Internal (9xxx)
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
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} named {name}")]
    NotFound { resource_type: String, name: String },

    // Graph store errors
    #[error("Knowledge graph unavailable: {message}")]
    GraphUnavailable { message: String },

    #[error("Knowledge graph query timed out after {timeout_ms}ms")]
    GraphTimeout { timeout_ms: u64 },

    // External service errors
    #[error("Semantic service error: {message}")]
    UpstreamError { message: String },

    #[error("Semantic service timed out after {timeout_ms}ms")]
    UpstreamTimeout { timeout_ms: u64 },

    // Internal errors
    #[error("Internal server error: {message}")]
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
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::GraphUnavailable { .. } => ErrorCode::GraphUnavailable,
            AppError::GraphTimeout { .. } => ErrorCode::GraphTimeout,
            AppError::UpstreamError { .. } => ErrorCode::UpstreamError,
            AppError::UpstreamTimeout { .. } => ErrorCode::UpstreamTimeout,
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
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::GraphUnavailable { .. } | AppError::GraphTimeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 504 Gateway Timeout
            AppError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// True for failures of the knowledge graph store itself
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::GraphUnavailable { .. } | AppError::GraphTimeout { .. }
        )
    }

    /// Transient failures are worth retrying by the caller
    pub fn is_transient(&self) -> bool {
        self.is_store_unavailable()
            || matches!(
                self,
                AppError::UpstreamError { .. } | AppError::UpstreamTimeout { .. }
            )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message shown to end users; infrastructure details stay in the logs
    pub fn public_message(&self) -> String {
        if self.is_store_unavailable() {
            "医疗知识服务暂时不可用，请稍后再试。".to_string()
        } else if self.is_transient() {
            "问题分析服务暂时不可用，请稍后再试。".to_string()
        } else if self.is_server_error() {
            "服务内部错误，请稍后再试。".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let internal = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %internal,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %internal,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
                retryable: self.is_transient(),
                request_id: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<neo4rs::Error> for AppError {
    fn from(err: neo4rs::Error) -> Self {
        AppError::GraphUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
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
        let err = AppError::NotFound {
            resource_type: "Disease".into(),
            name: "感冒".into(),
        };
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_store_failures_are_transient() {
        let timeout = AppError::GraphTimeout { timeout_ms: 3000 };
        let down = AppError::GraphUnavailable {
            message: "connection refused".into(),
        };

        for err in [timeout, down] {
            assert!(err.is_store_unavailable());
            assert!(err.is_transient());
            assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
            assert!(err.public_message().contains("暂时不可用"));
            assert!(!err.public_message().contains("connection refused"));
        }
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "question is empty".into(),
            field: Some("question".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
        assert_eq!(err.public_message(), "Validation failed: question is empty");
    }

    #[test]
    fn test_upstream_timeout() {
        let err = AppError::UpstreamTimeout { timeout_ms: 5000 };
        assert_eq!(err.code().as_code(), 8002);
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.is_transient());
        assert!(!err.is_store_unavailable());
    }
}
