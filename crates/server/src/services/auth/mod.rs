//! Account and password authentication service.
//!
//! Credentials are stored as Argon2id PHC strings. Accounts created before
//! hashing was introduced may still hold a plaintext credential; login
//! accepts those by exact comparison and leaves them untouched. The CLI's
//! `accounts migrate-passwords` command is the only thing that rewrites them.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use cadastro_core::{AccountId, Email};

use crate::db::{AccountStore, RepositoryError};
use crate::models::{Account, DebugAccount};
use crate::services::tokens::constant_time_compare;
use crate::validation::ValidationErrors;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 255;

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 100;

/// Hash checked when the email matches no account, so that path costs the
/// same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("cadastro-sem-conta").unwrap_or_default());

/// Checks a password against a stored credential.
pub type PasswordCheck = fn(&str, &str) -> bool;

/// Authentication service.
///
/// Handles registration, login, profile changes and account removal.
/// Mutations are limited to the caller's own account; anything else is
/// reported as [`AuthError::AccountNotFound`].
pub struct AuthService<'a> {
    accounts: &'a dyn AccountStore,
    verify: PasswordCheck,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(accounts: &'a dyn AccountStore) -> Self {
        Self::with_verifier(accounts, verify_password)
    }

    /// Create a service that checks passwords with `verify`.
    #[must_use]
    pub const fn with_verifier(accounts: &'a dyn AccountStore, verify: PasswordCheck) -> Self {
        Self { accounts, verify }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if name, email or password is invalid.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let mut errors = profile_errors(name, email);
        if let Err(AuthError::WeakPassword(msg)) = validate_password(password) {
            errors.add("senha", msg);
        }
        errors.into_result()?;

        let email = parse_email(email)?;
        if self.accounts.email_taken(&email, None).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(password)?;
        let account = self
            .accounts
            .create(name, &email, &password_hash)
            .await
            .map_err(map_conflict)?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Check an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown or malformed
    /// email and for a wrong password alike.
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let credential = match Email::parse(email.trim()) {
            Ok(email) => self.accounts.credential_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(credential) = credential else {
            (self.verify)(password, &DUMMY_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        if !(self.verify)(password, &credential.password) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(credential.account)
    }

    /// All accounts, without credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Account>, AuthError> {
        Ok(self.accounts.list().await?)
    }

    /// One account, without credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if no such account exists.
    pub async fn get(&self, id: AccountId) -> Result<Account, AuthError> {
        self.accounts
            .get(id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Reject operations on any account other than the caller's own.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` when `caller != id`.
    pub const fn ensure_self(caller: AccountId, id: AccountId) -> Result<(), AuthError> {
        if caller.as_i32() == id.as_i32() {
            Ok(())
        } else {
            Err(AuthError::AccountNotFound)
        }
    }

    /// Change name and email of the caller's own account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if `id` is not the caller's account.
    /// Returns `AuthError::Validation` for invalid fields and
    /// `AuthError::EmailTaken` if another account holds the email.
    pub async fn update(
        &self,
        caller: AccountId,
        id: AccountId,
        name: &str,
        email: &str,
    ) -> Result<Account, AuthError> {
        Self::ensure_self(caller, id)?;
        profile_errors(name, email).into_result()?;

        let email = parse_email(email)?;
        if self.accounts.email_taken(&email, Some(id)).await? {
            return Err(AuthError::EmailTaken);
        }

        let account = self
            .accounts
            .update(id, name, &email)
            .await
            .map_err(map_conflict)?
            .ok_or(AuthError::AccountNotFound)?;

        tracing::info!(account_id = %id, "Account updated");
        Ok(account)
    }

    /// Change the caller's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if `id` is not the caller's account,
    /// `AuthError::InvalidCredentials` if `current` is wrong and
    /// `AuthError::WeakPassword` if `new` does not meet the length rules.
    pub async fn change_password(
        &self,
        caller: AccountId,
        id: AccountId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        Self::ensure_self(caller, id)?;

        let credential = self
            .accounts
            .credential_by_id(id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !(self.verify)(current, &credential.password) {
            return Err(AuthError::InvalidCredentials);
        }

        validate_password(new)?;
        let password_hash = hash_password(new)?;

        if !self.accounts.set_password(id, &password_hash).await? {
            return Err(AuthError::AccountNotFound);
        }

        tracing::info!(account_id = %id, "Password changed");
        Ok(())
    }

    /// Delete the caller's own account row.
    ///
    /// Owned records go with it (cascade); product images must be removed
    /// by the caller beforehand.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if `id` is not the caller's account
    /// or no longer exists.
    pub async fn delete(&self, caller: AccountId, id: AccountId) -> Result<(), AuthError> {
        Self::ensure_self(caller, id)?;

        if !self.accounts.delete(id).await? {
            return Err(AuthError::AccountNotFound);
        }

        tracing::info!(account_id = %id, "Account deleted");
        Ok(())
    }

    /// Every account with its raw stored credential.
    ///
    /// Only for the debug endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn debug_credentials(&self) -> Result<Vec<DebugAccount>, AuthError> {
        let credentials = self.accounts.list_credentials().await?;
        Ok(credentials.into_iter().map(DebugAccount::from).collect())
    }

    /// Hash every credential still stored in plaintext.
    ///
    /// Returns how many accounts were migrated.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` or `AuthError::Repository` on the
    /// first failure; accounts migrated before it stay migrated.
    pub async fn migrate_legacy_passwords(&self) -> Result<usize, AuthError> {
        let mut migrated = 0;
        for credential in self.accounts.list_credentials().await? {
            if is_hashed(&credential.password) {
                continue;
            }

            let password_hash = hash_password(&credential.password)?;
            self.accounts
                .set_password(credential.account.id, &password_hash)
                .await?;
            tracing::info!(account_id = %credential.account.id, "Legacy credential hashed");
            migrated += 1;
        }
        Ok(migrated)
    }
}

fn map_conflict(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::EmailTaken,
        other => AuthError::Repository(other),
    }
}

fn parse_email(email: &str) -> Result<Email, AuthError> {
    Email::parse(email.trim()).map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.add("email", "e-mail inválido");
        AuthError::Validation(errors)
    })
}

fn profile_errors(name: &str, email: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.require("nome", name, MAX_NAME_LENGTH);
    errors.require_email("email", email, MAX_EMAIL_LENGTH);
    errors
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` when the length is out of range.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "a senha deve ter no mínimo {MIN_PASSWORD_LENGTH} caracteres"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "a senha deve ter no máximo {MAX_PASSWORD_LENGTH} caracteres"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Whether a stored credential is a PHC hash rather than legacy plaintext.
#[must_use]
pub fn is_hashed(stored: &str) -> bool {
    PasswordHash::new(stored).is_ok()
}

/// Verify a password against a stored credential.
///
/// Hashed credentials are checked with Argon2. Anything that does not parse
/// as a PHC string is a legacy plaintext credential and must match exactly.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => constant_time_compare(password, stored),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryAccountStore;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("s3nha-forte").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(is_hashed(&hash));
        assert!(verify_password("s3nha-forte", &hash));
        assert!(!verify_password("outra-senha", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("123456").unwrap(), hash_password("123456").unwrap());
    }

    #[test]
    fn test_legacy_plaintext_verifies_by_equality() {
        assert!(!is_hashed("demo123456"));
        assert!(verify_password("demo123456", "demo123456"));
        assert!(!verify_password("demo12345", "demo123456"));
    }

    #[test]
    fn test_password_length_rules() {
        assert!(matches!(validate_password("12345"), Err(AuthError::WeakPassword(_))));
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(255)).is_ok());
        assert!(matches!(
            validate_password(&"x".repeat(256)),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let store = MemoryAccountStore::new();
        let auth = AuthService::new(&store);

        auth.register("Ana", "ana@exemplo.com", "123456").await.unwrap();
        let second = auth.register("Ana 2", "ana@exemplo.com", "654321").await;

        assert!(matches!(second, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_register_collects_field_errors() {
        let store = MemoryAccountStore::new();
        let auth = AuthService::new(&store);

        let Err(AuthError::Validation(errors)) = auth.register("", "nope", "123").await else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "nome", "senha"]);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryAccountStore::new();
        let auth = AuthService::new(&store);
        auth.register("Ana", "ana@exemplo.com", "123456").await.unwrap();

        let wrong_password = auth.login("ana@exemplo.com", "000000").await.unwrap_err();
        let unknown_email = auth.login("ninguem@exemplo.com", "123456").await.unwrap_err();
        let malformed = auth.login("not an email", "123456").await.unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));

        let account = auth.login("ana@exemplo.com", "123456").await.unwrap();
        assert_eq!(account.name, "Ana");
    }

    thread_local! {
        static CHECKED: std::cell::RefCell<Vec<String>> = const { std::cell::RefCell::new(Vec::new()) };
    }

    fn recording_verify(password: &str, stored: &str) -> bool {
        CHECKED.with(|checked| checked.borrow_mut().push(stored.to_string()));
        verify_password(password, stored)
    }

    #[tokio::test]
    async fn test_unknown_email_pays_for_a_hash_check() {
        let store = MemoryAccountStore::new();
        AuthService::new(&store)
            .register("Ana", "ana@exemplo.com", "123456")
            .await
            .unwrap();
        let auth = AuthService::with_verifier(&store, recording_verify);

        auth.login("ana@exemplo.com", "000000").await.unwrap_err();
        auth.login("ninguem@exemplo.com", "123456").await.unwrap_err();
        auth.login("not an email", "123456").await.unwrap_err();

        let checked = CHECKED.with(|checked| checked.borrow().clone());
        assert_eq!(checked.len(), 3);
        assert!(checked.iter().all(|stored| is_hashed(stored)));
        assert_eq!(checked[1], checked[2]);
        assert_ne!(checked[0], checked[1]);
    }

    #[tokio::test]
    async fn test_login_accepts_legacy_plaintext_without_rehash() {
        let store = MemoryAccountStore::new();
        let email = Email::parse("demo@email.com").unwrap();
        let account = store.create("Demo", &email, "demo123456").await.unwrap();
        let auth = AuthService::new(&store);

        auth.login("demo@email.com", "demo123456").await.unwrap();

        let stored = store.credential_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(stored.password, "demo123456");
    }

    #[tokio::test]
    async fn test_migrate_legacy_passwords() {
        let store = MemoryAccountStore::new();
        let email = Email::parse("demo@email.com").unwrap();
        let legacy = store.create("Demo", &email, "demo123456").await.unwrap();
        let auth = AuthService::new(&store);
        auth.register("Ana", "ana@exemplo.com", "123456").await.unwrap();

        assert_eq!(auth.migrate_legacy_passwords().await.unwrap(), 1);
        assert_eq!(auth.migrate_legacy_passwords().await.unwrap(), 0);

        let stored = store.credential_by_id(legacy.id).await.unwrap().unwrap();
        assert!(is_hashed(&stored.password));
        auth.login("demo@email.com", "demo123456").await.unwrap();
    }

    #[tokio::test]
    async fn test_mutations_limited_to_own_account() {
        let store = MemoryAccountStore::new();
        let auth = AuthService::new(&store);
        let ana = auth.register("Ana", "ana@exemplo.com", "123456").await.unwrap();
        let bia = auth.register("Bia", "bia@exemplo.com", "123456").await.unwrap();

        assert!(matches!(
            auth.update(ana.id, bia.id, "X", "x@exemplo.com").await,
            Err(AuthError::AccountNotFound)
        ));
        assert!(matches!(
            auth.change_password(ana.id, bia.id, "123456", "abcdef").await,
            Err(AuthError::AccountNotFound)
        ));
        assert!(matches!(auth.delete(ana.id, bia.id).await, Err(AuthError::AccountNotFound)));
        assert!(auth.get(bia.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_email_of_another_account() {
        let store = MemoryAccountStore::new();
        let auth = AuthService::new(&store);
        let ana = auth.register("Ana", "ana@exemplo.com", "123456").await.unwrap();
        auth.register("Bia", "bia@exemplo.com", "123456").await.unwrap();

        assert!(matches!(
            auth.update(ana.id, ana.id, "Ana", "bia@exemplo.com").await,
            Err(AuthError::EmailTaken)
        ));
        let same = auth.update(ana.id, ana.id, "Ana Maria", "ana@exemplo.com").await.unwrap();
        assert_eq!(same.name, "Ana Maria");
    }

    #[tokio::test]
    async fn test_change_password_checks_current_and_minimum() {
        let store = MemoryAccountStore::new();
        let auth = AuthService::new(&store);
        let ana = auth.register("Ana", "ana@exemplo.com", "123456").await.unwrap();

        assert!(matches!(
            auth.change_password(ana.id, ana.id, "errada", "abcdef").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.change_password(ana.id, ana.id, "123456", "abc").await,
            Err(AuthError::WeakPassword(_))
        ));

        auth.change_password(ana.id, ana.id, "123456", "abcdef").await.unwrap();
        auth.login("ana@exemplo.com", "abcdef").await.unwrap();
    }
}
