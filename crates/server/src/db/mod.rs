//! Persistence for accounts and owned records.
//!
//! # Tables
//!
//! - `account` - Account holders (login email, credential)
//! - `client` - Clients, owned by an account
//! - `supplier` - Suppliers, owned by an account
//! - `product` - Products with an optional image reference, owned by an account
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Every store is a trait with a `PostgreSQL` implementation and an in-memory
//! one. The in-memory stores back development mode and the test suites.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p cadastro-cli -- migrate
//! ```

pub mod accounts;
pub mod records;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use accounts::{AccountStore, MemoryAccountStore, PgAccountStore};
pub use records::{MemoryRecordStore, PgRecordStore, Record, RecordStore};

/// SQLSTATE for a serialization failure under concurrent writes.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for a detected deadlock.
const DEADLOCK_DETECTED: &str = "40P01";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation or stale concurrent write.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a write error, turning constraint and concurrency failures into
/// [`RepositoryError::Conflict`].
pub(crate) fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict("email already exists".to_owned());
        }
        if matches!(
            db_err.code().as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ) {
            return RepositoryError::Conflict("concurrent write, retry the request".to_owned());
        }
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
