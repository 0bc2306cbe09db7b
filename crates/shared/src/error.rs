//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Message returned to callers for any failure that must not leak detail.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Permission codes involved in a denied authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenial {
    /// Codes the gate required (any one of them would have sufficed).
    pub required: Vec<String>,
    /// Flattened permission codes the caller actually holds.
    pub available: Vec<String>,
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// No verifiable identity on the request.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Identity present but the action is not allowed.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// The permission gate found no qualifying grant.
    #[error("Access denied: missing permission {}", .0.required.join(" | "))]
    PermissionDenied(Box<PermissionDenial>),

    /// A write targeted a month that is closed.
    #[error("Month is closed: {0}")]
    MonthClosed(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (e.g., stale version, repeated state change).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a permission denial from the required and available code sets.
    #[must_use]
    pub fn permission_denied(
        required: impl IntoIterator<Item = impl Into<String>>,
        available: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::PermissionDenied(Box::new(PermissionDenial {
            required: required.into_iter().map(Into::into).collect(),
            available: available.into_iter().map(Into::into).collect(),
        }))
    }

    /// Wraps any displayable error as a database failure.
    #[must_use]
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }

    /// Wraps any displayable error as an internal failure.
    #[must_use]
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) | Self::PermissionDenied(_) | Self::MonthClosed(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) | Self::PermissionDenied(_) => "FORBIDDEN",
            Self::MonthClosed(_) => "MONTH_CLOSED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true for failures whose detail must stay server-side.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }

    /// Returns the message that is safe to show to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::MonthClosed(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::PermissionDenied(_) => "Forbidden".to_string(),
            Self::Database(_) | Self::Internal(_) => INTERNAL_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
