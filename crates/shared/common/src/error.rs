//! Unified error handling for the store core.
//!
//! A single error type carries the whole taxonomy. Collaborators map it to
//! transport responses through [`AppError::outcome`] or, for HTTP, the axum
//! `IntoResponse` implementation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Startup
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store used before a profile was resolved")]
    NotInitialized,

    // Pool
    #[error("No pooled connection available within {timeout_ms}ms")]
    PoolTimeout { timeout_ms: u64 },

    // Caller input
    #[error("{0}")]
    Validation(String),

    #[error("No record found for id: {0}")]
    NotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Transactions
    #[error("Transaction rolled back: {0}")]
    RolledBack(String),

    #[error("Rollback failed ({rollback}) after: {cause}")]
    RollbackFailed {
        #[source]
        cause: Box<AppError>,
        rollback: Box<AppError>,
    },

    #[error("Transaction scope already open for this operation")]
    NestedScope,

    #[error("Operation cancelled")]
    Cancelled,

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// How a collaborator should surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    Rejected,
    /// Retry later with backoff
    Backpressure,
    Failure,
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::NotInitialized => "NOT_INITIALIZED",
            AppError::PoolTimeout { .. } => "POOL_TIMEOUT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::RolledBack(_) => "ROLLED_BACK",
            AppError::RollbackFailed { .. } => "ROLLBACK_FAILED",
            AppError::NestedScope => "NESTED_SCOPE",
            AppError::Cancelled => "CANCELLED",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify for callers
    pub fn outcome(&self) -> Outcome {
        match self {
            AppError::NotFound(_) => Outcome::NotFound,
            AppError::Validation(_) | AppError::InvalidCredentials => Outcome::Rejected,
            AppError::PoolTimeout { .. } => Outcome::Backpressure,
            _ => Outcome::Failure,
        }
    }

    /// Only pool exhaustion is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::PoolTimeout { .. })
    }

    /// Errors that indicate a broken process or uncertain store state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::NotInitialized
                | AppError::NestedScope
                | AppError::RollbackFailed { .. }
        )
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::PoolTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(_) | AppError::InvalidCredentials | AppError::PoolTimeout { .. } => {
                self.to_string()
            }

            // Hide details for internal errors
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => {
                tracing::error!("Store error: {}", self);
                "An internal error occurred".to_string()
            }
        }
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::NotFound(id) => AppError::NotFound(id),
            DomainError::InvalidCredentials => AppError::InvalidCredentials,
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, id: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, id: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(id.to_string()))
    }
}

/// Convenience constructors
impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        AppError::NotFound(id.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
