//! Application-wide error type for the routing engine.
//!
//! Every fallible service and repository operation returns [`AppError`]. Each
//! variant carries a human-readable message plus a structured `details`
//! payload so callers (the HTTP controller layer lives outside this crate)
//! can surface field-level information without re-parsing strings.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// Machine-readable error envelope, suitable for direct serialization.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug)]
pub enum AppError {
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    Forbidden { message: String, details: Value },
    LimitExceeded { message: String, details: Value },
    Conflict { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn forbidden(message: impl Into<String>, details: Value) -> Self {
        Self::Forbidden {
            message: message.into(),
            details,
        }
    }
    pub fn limit_exceeded(message: impl Into<String>, details: Value) -> Self {
        Self::LimitExceeded {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Stable error code for API consumers and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::LimitExceeded { .. } => "rule_limit_exceeded",
            Self::Conflict { .. } => "conflict",
            Self::Internal { .. } => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::Forbidden { message, .. }
            | Self::LimitExceeded { message, .. }
            | Self::Conflict { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Flattens the error into a serializable envelope.
    pub fn info(self) -> ErrorInfo {
        let code = self.code();
        match self {
            Self::Validation { message, details }
            | Self::NotFound { message, details }
            | Self::Forbidden { message, details }
            | Self::LimitExceeded { message, details }
            | Self::Conflict { message, details }
            | Self::Internal { message, details } => ErrorInfo {
                code,
                message,
                details,
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": db.constraint() }),
            );
        }

        tracing::error!("Database error: {e}");
        AppError::internal("Database error", json!({}))
    }
}
