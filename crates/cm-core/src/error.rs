//! # AppError
//!
//! Centralized error handling for the commune ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all cm-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Community, Post, Comment)
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., title too long, malformed community name)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Security/Auth failure (e.g., banned, not a moderator)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate community name)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

/// A specialized Result type for commune logic.
pub type Result<T> = std::result::Result<T, AppError>;
