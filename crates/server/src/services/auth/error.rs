//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::validation::ValidationErrors;

/// Errors that can occur during account and authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, malformed email or wrong password. Deliberately vague.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Another account already uses this email.
    #[error("email already registered")]
    EmailTaken,

    /// Password too short or too long.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// One or more fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Account missing, or not the caller's own.
    #[error("account not found")]
    AccountNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
