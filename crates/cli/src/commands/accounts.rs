//! Account management commands.
//!
//! # Environment Variables
//!
//! - `CADASTRO_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `CADASTRO_SESSION_SECRET` - Signing key for `issue-token`

use secrecy::SecretString;

use cadastro_core::AccountId;
use cadastro_server::db::{AccountStore, PgAccountStore};
use cadastro_server::services::auth::AuthService;
use cadastro_server::services::tokens::TokenSigner;

use super::{CliError, connect};

/// Create an account with a hashed password.
///
/// # Errors
///
/// Returns an error if validation fails, the email is taken or the database
/// is unreachable.
pub async fn create(name: &str, email: &str, password: &str) -> Result<AccountId, CliError> {
    let store = PgAccountStore::new(connect().await?);

    let account = AuthService::new(&store)
        .register(name, email, password)
        .await?;

    tracing::info!(account_id = %account.id, email = %account.email, "Account created");
    Ok(account.id)
}

/// Hash every credential still stored in plaintext.
///
/// # Errors
///
/// Returns an error on the first failure; accounts migrated before it stay
/// migrated.
pub async fn migrate_passwords() -> Result<(), CliError> {
    let store = PgAccountStore::new(connect().await?);

    let migrated = AuthService::new(&store).migrate_legacy_passwords().await?;

    tracing::info!(migrated, "Legacy credentials hashed");
    Ok(())
}

/// Print a bearer token for account `id`.
///
/// # Errors
///
/// Returns an error if the secret is missing, the account does not exist or
/// the database is unreachable.
pub async fn issue_token(id: i32) -> Result<(), CliError> {
    let secret = std::env::var("CADASTRO_SESSION_SECRET")
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("CADASTRO_SESSION_SECRET"))?;

    let store = PgAccountStore::new(connect().await?);
    let account = store
        .get(AccountId::new(id))
        .await?
        .ok_or(CliError::UnknownAccount(id))?;

    let token = TokenSigner::new(secret).issue(account.id)?;
    tracing::info!(account_id = %account.id, "Token issued");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}
