//! Account storage.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;

use cadastro_core::{AccountId, Email};

use super::{RepositoryError, map_write_error};
use crate::models::{Account, AccountCredential};

/// Storage for accounts and their credentials.
///
/// Email uniqueness is enforced by the store itself: `create` and `update`
/// fail with [`RepositoryError::Conflict`] when another account already
/// holds the address.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// All accounts, ordered by id.
    async fn list(&self) -> Result<Vec<Account>, RepositoryError>;

    /// One account by id.
    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Account and stored credential by exact email.
    async fn credential_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AccountCredential>, RepositoryError>;

    /// Account and stored credential by id.
    async fn credential_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<AccountCredential>, RepositoryError>;

    /// Whether an account other than `exclude` uses `email`.
    async fn email_taken(
        &self,
        email: &Email,
        exclude: Option<AccountId>,
    ) -> Result<bool, RepositoryError>;

    /// Insert an account with an already-hashed credential.
    async fn create(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<Account, RepositoryError>;

    /// Replace name and email. Returns `None` if the account does not exist.
    async fn update(
        &self,
        id: AccountId,
        name: &str,
        email: &Email,
    ) -> Result<Option<Account>, RepositoryError>;

    /// Replace the stored credential. Returns whether the account exists.
    async fn set_password(&self, id: AccountId, password: &str) -> Result<bool, RepositoryError>;

    /// Delete an account. Returns whether a row was removed.
    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError>;

    /// Every account with its stored credential.
    async fn list_credentials(&self) -> Result<Vec<AccountCredential>, RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// `PostgreSQL` implementation of [`AccountStore`].
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, Account>(
            r"
            SELECT id, name, email, created_at
            FROM account
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, Account>(
            r"
            SELECT id, name, email, created_at
            FROM account
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn credential_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AccountCredential>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountCredential>(
            r"
            SELECT id, name, email, created_at, password
            FROM account
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn credential_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<AccountCredential>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountCredential>(
            r"
            SELECT id, name, email, created_at, password
            FROM account
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn email_taken(
        &self,
        email: &Email,
        exclude: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM account
                WHERE email = $1 AND ($2::INTEGER IS NULL OR id <> $2)
            )
            ",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<Account, RepositoryError> {
        sqlx::query_as::<_, Account>(
            r"
            INSERT INTO account (name, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, created_at
            ",
        )
        .bind(name)
        .bind(email)
        .bind(password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update(
        &self,
        id: AccountId,
        name: &str,
        email: &Email,
    ) -> Result<Option<Account>, RepositoryError> {
        sqlx::query_as::<_, Account>(
            r"
            UPDATE account
            SET name = $2, email = $3
            WHERE id = $1
            RETURNING id, name, email, created_at
            ",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn set_password(&self, id: AccountId, password: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE account SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(password)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_credentials(&self) -> Result<Vec<AccountCredential>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountCredential>(
            r"
            SELECT id, name, email, created_at, password
            FROM account
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory implementation of [`AccountStore`].
pub struct MemoryAccountStore {
    rows: RwLock<BTreeMap<AccountId, AccountCredential>>,
    next_id: AtomicI32,
}

impl MemoryAccountStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI32::new(1),
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

fn email_conflict() -> RepositoryError {
    RepositoryError::Conflict("email already exists".to_owned())
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.values().map(|c| c.account.clone()).collect())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).map(|c| c.account.clone()))
    }

    async fn credential_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AccountCredential>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.values().find(|c| &c.account.email == email).cloned())
    }

    async fn credential_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<AccountCredential>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).cloned())
    }

    async fn email_taken(
        &self,
        email: &Email,
        exclude: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .any(|c| &c.account.email == email && Some(c.account.id) != exclude))
    }

    async fn create(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<Account, RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|c| &c.account.email == email) {
            return Err(email_conflict());
        }

        let id = AccountId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let account = Account {
            id,
            name: name.to_owned(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        rows.insert(
            id,
            AccountCredential {
                account: account.clone(),
                password: password.to_owned(),
            },
        );
        Ok(account)
    }

    async fn update(
        &self,
        id: AccountId,
        name: &str,
        email: &Email,
    ) -> Result<Option<Account>, RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows
            .values()
            .any(|c| &c.account.email == email && c.account.id != id)
        {
            return Err(email_conflict());
        }

        Ok(rows.get_mut(&id).map(|c| {
            c.account.name = name.to_owned();
            c.account.email = email.clone();
            c.account.clone()
        }))
    }

    async fn set_password(&self, id: AccountId, password: &str) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.write().await;
        let Some(credential) = rows.get_mut(&id) else {
            return Ok(false);
        };
        credential.password = password.to_owned();
        Ok(true)
    }

    async fn delete(&self, id: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn list_credentials(&self) -> Result<Vec<AccountCredential>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.values().cloned().collect())
    }
}
