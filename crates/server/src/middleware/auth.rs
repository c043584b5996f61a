//! Owner extraction for protected routes.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use cadastro_core::AccountId;

use crate::error::AppError;
use crate::models::session_keys;
use crate::services::credentials::{IdentityClaims, RequestContext, Resolution};
use crate::state::AppState;

/// Extractor that requires a resolvable caller.
///
/// Runs the state's [`CredentialResolver`](crate::services::credentials::CredentialResolver)
/// over the request's session and bearer claims. Rejects with 401
/// `Usuário não autenticado` when nobody vouches for the caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireOwner(owner): RequireOwner) -> impl IntoResponse {
///     format!("account {owner}")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireOwner(pub AccountId);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext {
            session: parts.extensions.get::<Session>(),
            claims: parts.extensions.get::<IdentityClaims>(),
        };

        match state.resolver().resolve(&ctx).await {
            Resolution::Found(owner) => Ok(Self(owner)),
            Resolution::Unauthenticated => Err(AppError::unauthenticated()),
        }
    }
}

/// Bind the session to `account` after a successful login.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_account(
    session: &Session,
    account: AccountId,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::ACCOUNT_ID, account.as_i32())
        .await
}

/// Drop everything in the session (logout, account deletion).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_account(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
