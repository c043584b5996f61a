//! Owner-scoped storage for clients, suppliers and products.
//!
//! Every statement filters on `owner_id`, so a record owned by another
//! account behaves exactly like a missing one.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres};
use tokio::sync::RwLock;

use cadastro_core::AccountId;

use super::{RepositoryError, map_write_error};
use crate::validation::Validate;

/// A query whose draft values still have to be bound.
pub type DraftQuery<'q, T> = QueryAs<'q, Postgres, T, PgArguments>;

/// An entity that belongs to exactly one account.
///
/// Implementors describe their table layout; [`PgRecordStore`] and
/// [`MemoryRecordStore`] supply the owner-scoped operations.
pub trait Record: for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static {
    /// Typed primary key.
    type Id: Copy
        + Ord
        + Send
        + Sync
        + From<i32>
        + fmt::Display
        + fmt::Debug
        + sqlx::Type<Postgres>
        + for<'q> sqlx::Encode<'q, Postgres>
        + 'static;

    /// Caller-supplied field values for create and update.
    type Draft: Validate + Send + Sync;

    /// Table name.
    const TABLE: &'static str;

    /// Mutable business columns, in the order [`Record::bind_draft`] binds them.
    const FIELDS: &'static [&'static str];

    /// Record identity.
    fn id(&self) -> Self::Id;

    /// Owning account.
    fn owner(&self) -> AccountId;

    /// Build a record from a validated draft.
    fn from_draft(id: Self::Id, owner: AccountId, created_at: DateTime<Utc>, draft: &Self::Draft)
    -> Self;

    /// Replace the business fields with the draft's values.
    fn apply_draft(&mut self, draft: &Self::Draft);

    /// Bind the draft's values in [`Record::FIELDS`] order.
    fn bind_draft<'q>(draft: &'q Self::Draft, query: DraftQuery<'q, Self>) -> DraftQuery<'q, Self>;
}

/// Owner-scoped CRUD over one record type.
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    /// All records of `owner`, newest first.
    async fn list(&self, owner: AccountId) -> Result<Vec<T>, RepositoryError>;

    /// One record, if `owner` owns it.
    async fn get(&self, owner: AccountId, id: T::Id) -> Result<Option<T>, RepositoryError>;

    /// Insert a record for `owner`. The draft must already be validated.
    async fn create(&self, owner: AccountId, draft: &T::Draft) -> Result<T, RepositoryError>;

    /// Replace the business fields of a record owned by `owner`.
    ///
    /// Returns `None` when no such record is owned by `owner`.
    async fn update(
        &self,
        owner: AccountId,
        id: T::Id,
        draft: &T::Draft,
    ) -> Result<Option<T>, RepositoryError>;

    /// Delete a record owned by `owner`. Returns whether a row was removed.
    async fn delete(&self, owner: AccountId, id: T::Id) -> Result<bool, RepositoryError>;

    /// Delete every record of `owner`, returning how many were removed.
    async fn purge(&self, owner: AccountId) -> Result<u64, RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// `PostgreSQL` implementation of [`RecordStore`].
pub struct PgRecordStore<T> {
    pool: PgPool,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> PgRecordStore<T> {
    /// Create a store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    fn columns() -> String {
        format!("id, owner_id, created_at, {}", T::FIELDS.join(", "))
    }

    fn list_sql() -> String {
        format!(
            "SELECT {} FROM {} WHERE owner_id = $1 ORDER BY id DESC",
            Self::columns(),
            T::TABLE
        )
    }

    fn get_sql() -> String {
        format!(
            "SELECT {} FROM {} WHERE id = $1 AND owner_id = $2",
            Self::columns(),
            T::TABLE
        )
    }

    fn insert_sql() -> String {
        let placeholders: Vec<String> = (0..T::FIELDS.len()).map(|i| format!("${}", i + 2)).collect();
        format!(
            "INSERT INTO {} (owner_id, {}) VALUES ($1, {}) RETURNING {}",
            T::TABLE,
            T::FIELDS.join(", "),
            placeholders.join(", "),
            Self::columns()
        )
    }

    fn update_sql() -> String {
        let assignments: Vec<String> = T::FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| format!("{field} = ${}", i + 3))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE id = $1 AND owner_id = $2 RETURNING {}",
            T::TABLE,
            assignments.join(", "),
            Self::columns()
        )
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for PgRecordStore<T> {
    async fn list(&self, owner: AccountId) -> Result<Vec<T>, RepositoryError> {
        let sql = Self::list_sql();
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, owner: AccountId, id: T::Id) -> Result<Option<T>, RepositoryError> {
        let sql = Self::get_sql();
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create(&self, owner: AccountId, draft: &T::Draft) -> Result<T, RepositoryError> {
        let sql = Self::insert_sql();
        let query = sqlx::query_as::<_, T>(&sql).bind(owner);
        T::bind_draft(draft, query)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update(
        &self,
        owner: AccountId,
        id: T::Id,
        draft: &T::Draft,
    ) -> Result<Option<T>, RepositoryError> {
        let sql = Self::update_sql();
        let query = sqlx::query_as::<_, T>(&sql).bind(id).bind(owner);
        T::bind_draft(draft, query)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn delete(&self, owner: AccountId, id: T::Id) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND owner_id = $2", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge(&self, owner: AccountId) -> Result<u64, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE owner_id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory implementation of [`RecordStore`].
///
/// Identities are assigned from a counter starting at 1, like a serial column.
pub struct MemoryRecordStore<T: Record> {
    rows: RwLock<BTreeMap<T::Id, T>>,
    next_id: AtomicI32,
}

impl<T: Record> MemoryRecordStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI32::new(1),
        }
    }
}

impl<T: Record> Default for MemoryRecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MemoryRecordStore<T> {
    async fn list(&self, owner: AccountId) -> Result<Vec<T>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .rev()
            .filter(|row| row.owner() == owner)
            .cloned()
            .collect())
    }

    async fn get(&self, owner: AccountId, id: T::Id) -> Result<Option<T>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).filter(|row| row.owner() == owner).cloned())
    }

    async fn create(&self, owner: AccountId, draft: &T::Draft) -> Result<T, RepositoryError> {
        let id = T::Id::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = T::from_draft(id, owner, Utc::now(), draft);
        self.rows.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        owner: AccountId,
        id: T::Id,
        draft: &T::Draft,
    ) -> Result<Option<T>, RepositoryError> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .get_mut(&id)
            .filter(|row| row.owner() == owner)
            .map(|row| {
                row.apply_draft(draft);
                row.clone()
            }))
    }

    async fn delete(&self, owner: AccountId, id: T::Id) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.get(&id).is_some_and(|row| row.owner() == owner) {
            rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn purge(&self, owner: AccountId) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| row.owner() != owner);
        Ok((before - rows.len()) as u64)
    }
}
