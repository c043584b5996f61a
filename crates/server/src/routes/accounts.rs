//! Account handlers: login, logout, registration and self-service changes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_sessions::Session;

use cadastro_core::AccountId;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireOwner, clear_current_account, set_current_account};
use crate::models::{
    Account, ChangePasswordRequest, DebugAccount, LoginRequest, LoginResponse, RegisterRequest,
    UpdateAccountRequest,
};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Registration response: the new account plus a confirmation message.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub account: Account,
    #[serde(rename = "mensagem")]
    pub message: &'static str,
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

/// Log in with email and password and bind the session to the account.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email e senha são obrigatórios".to_string(),
        ));
    }

    let account = state.auth().login(&request.email, &request.password).await?;

    set_current_account(&session, account.id)
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&account.id);

    tracing::info!(account_id = %account.id, "Logged in");
    Ok(Json(account.into()))
}

/// Forget the session.
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_account(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(Json(json!({ "mensagem": "Logout realizado com sucesso" })))
}

/// The caller's own account.
pub async fn me(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
) -> Result<Json<Account>> {
    Ok(Json(state.auth().get(owner).await?))
}

/// Every account, without credentials.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Account>>> {
    Ok(Json(state.auth().list().await?))
}

/// One account, without credential.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<Json<Account>> {
    Ok(Json(state.auth().get(id).await?))
}

/// Register a new account.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let account = state
        .auth()
        .register(&request.name, &request.email, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account,
            message: "Usuário cadastrado com sucesso!",
        }),
    ))
}

/// Change the caller's own name and email.
pub async fn update(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<Account>> {
    state
        .auth()
        .update(owner, id, &request.name, &request.email)
        .await
        .map(Json)
        .map_err(|e| match e {
            AuthError::EmailTaken => {
                AppError::Conflict("Email já cadastrado por outro usuário".to_string())
            }
            other => other.into(),
        })
}

/// Change the caller's own password.
pub async fn change_password(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>> {
    state
        .auth()
        .change_password(owner, id, &request.current, &request.new)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => {
                AppError::BadRequest("Senha atual incorreta".to_string())
            }
            other => other.into(),
        })?;

    Ok(Json(json!({ "mensagem": "Senha alterada com sucesso!" })))
}

/// Delete the caller's own account with everything it owns.
///
/// Product images are removed first (best effort), then owned records and
/// the account row. The session is flushed afterwards.
pub async fn destroy(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<AccountId>,
) -> Result<Json<Value>> {
    AuthService::ensure_self(owner, id)?;
    state.auth().get(id).await?;

    state.products().purge(owner).await?;
    state.clients().purge(owner).await?;
    state.suppliers().purge(owner).await?;
    state.auth().delete(owner, id).await?;

    clear_current_account(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();

    Ok(Json(json!({ "mensagem": "Usuário excluído com sucesso!" })))
}

/// Raw stored credentials. Mounted only when debug routes are enabled.
pub async fn debug_credentials(State(state): State<AppState>) -> Result<Json<Vec<DebugAccount>>> {
    tracing::warn!("Raw credential listing requested");
    Ok(Json(state.auth().debug_credentials().await?))
}
