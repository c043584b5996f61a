//! CLI command implementations.

pub mod accounts;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use cadastro_server::db::{self, RepositoryError};
use cadastro_server::services::auth::AuthError;
use cadastro_server::services::tokens::SigningKeyError;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store query failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Account operation failed.
    #[error("Account error: {0}")]
    Auth(#[from] AuthError),

    /// Token signing failed.
    #[error("Token error: {0}")]
    Signing(#[from] SigningKeyError),

    /// No account with the given id.
    #[error("No account with id {0}")]
    UnknownAccount(i32),
}

/// Database URL from `CADASTRO_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CliError> {
    std::env::var("CADASTRO_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.is_empty())
        .map(SecretString::from)
        .ok_or(CliError::MissingEnvVar("CADASTRO_DATABASE_URL"))
}

/// Connect to the configured database.
async fn connect() -> Result<PgPool, CliError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&url).await?)
}
