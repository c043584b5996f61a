//! Seed commands.

use cadastro_server::db::PgAccountStore;
use cadastro_server::services::auth::{AuthError, AuthService};

use super::{CliError, connect};

const DEMO_NAME: &str = "Usuário Demo";
const DEMO_EMAIL: &str = "demo@email.com";
const DEMO_PASSWORD: &str = "demo123456";

/// Create the demo account unless it already exists.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn demo() -> Result<(), CliError> {
    let store = PgAccountStore::new(connect().await?);

    match AuthService::new(&store)
        .register(DEMO_NAME, DEMO_EMAIL, DEMO_PASSWORD)
        .await
    {
        Ok(account) => {
            tracing::info!(account_id = %account.id, email = DEMO_EMAIL, "Demo account created");
            Ok(())
        }
        Err(AuthError::EmailTaken) => {
            tracing::info!(email = DEMO_EMAIL, "Demo account already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
