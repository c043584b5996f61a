//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures internal errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Every body is JSON with a `mensagem` field;
//! validation failures add `campos` with per-field messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::records::RecordError;
use crate::validation::ValidationErrors;

/// Message sent for every internal failure.
const INTERNAL_MESSAGE: &str = "Erro interno do servidor";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Caller could not be identified.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Field-level validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Resource not found, or owned by somebody else.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation or concurrent write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convert a record error, naming the entity in the not-found message.
    #[must_use]
    pub fn record(err: RecordError, not_found: &str) -> Self {
        match err {
            RecordError::NotFound => Self::NotFound(not_found.to_string()),
            other => other.into(),
        }
    }

    /// The caller has no session and no valid bearer claims.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::Unauthorized("Usuário não autenticado".to_string())
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Registro não encontrado".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation(errors) => Self::Validation(errors),
            RecordError::NotFound => Self::NotFound("Registro não encontrado".to_string()),
            RecordError::Conflict(msg) => Self::Conflict(msg),
            RecordError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                Self::Unauthorized("Email ou senha incorretos".to_string())
            }
            AuthError::EmailTaken => Self::Conflict("Email já cadastrado".to_string()),
            AuthError::WeakPassword(msg) => {
                let mut errors = ValidationErrors::new();
                errors.add("senha", msg);
                Self::Validation(errors)
            }
            AuthError::Validation(errors) => Self::Validation(errors),
            AuthError::AccountNotFound => Self::NotFound("Usuário não encontrado".to_string()),
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Database(_) | Self::Internal(_) => json!({ "mensagem": INTERNAL_MESSAGE }),
            Self::Validation(errors) => json!({
                "mensagem": "Dados inválidos",
                "campos": errors,
            }),
            Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadRequest(msg) => json!({ "mensagem": msg }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after successful authentication to associate errors with accounts.
pub fn set_sentry_user(account_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the account.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
