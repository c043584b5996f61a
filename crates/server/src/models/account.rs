//! Account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadastro_core::{AccountId, Email};

use crate::validation::null_as_empty;

/// An account holder, without credential.
///
/// This is the only account shape returned by regular reads.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: Email,
    #[serde(rename = "dataCadastro")]
    pub created_at: DateTime<Utc>,
}

/// An account together with its stored credential.
///
/// The credential is either an Argon2 PHC string or, for accounts created
/// before hashing was introduced, the plaintext password.
#[derive(Clone, sqlx::FromRow)]
pub struct AccountCredential {
    #[sqlx(flatten)]
    pub account: Account,
    pub password: String,
}

impl std::fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredential")
            .field("account", &self.account)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Raw credential listing for the debug endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DebugAccount {
    pub id: AccountId,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: Email,
    #[serde(rename = "senha")]
    pub password: String,
    #[serde(rename = "dataCadastro")]
    pub created_at: DateTime<Utc>,
}

impl From<AccountCredential> for DebugAccount {
    fn from(credential: AccountCredential) -> Self {
        Self {
            id: credential.account.id,
            name: credential.account.name,
            email: credential.account.email,
            password: credential.password,
            created_at: credential.account.created_at,
        }
    }
}

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "nome", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(rename = "senha", default, deserialize_with = "null_as_empty")]
    pub password: String,
}

/// Login request.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(rename = "senha", default, deserialize_with = "null_as_empty")]
    pub password: String,
}

/// Profile update request. The credential is changed separately.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(rename = "nome", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
}

/// Password change request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "senhaAtual", default, deserialize_with = "null_as_empty")]
    pub current: String,
    #[serde(rename = "novaSenha", default, deserialize_with = "null_as_empty")]
    pub new: String,
}

/// Identity summary returned after a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub id: AccountId,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: Email,
    #[serde(rename = "mensagem")]
    pub message: &'static str,
}

impl From<Account> for LoginResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            message: "Login realizado com sucesso",
        }
    }
}
