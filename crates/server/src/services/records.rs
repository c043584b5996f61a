//! Owner-scoped record operations.
//!
//! [`OwnedRecords`] puts validation and the not-found policy in front of a
//! [`RecordStore`]. A record owned by somebody else is reported exactly like
//! a missing one.

use thiserror::Error;

use cadastro_core::AccountId;

use crate::db::{Record, RecordStore, RepositoryError};
use crate::validation::{Validate, ValidationErrors};

/// Errors from record operations.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RecordError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

/// Validated, owner-scoped access to one record type.
pub struct OwnedRecords<'a, T: Record> {
    store: &'a dyn RecordStore<T>,
}

impl<'a, T: Record> OwnedRecords<'a, T> {
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore<T>) -> Self {
        Self { store }
    }

    /// All records of `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store fails.
    pub async fn list(&self, owner: AccountId) -> Result<Vec<T>, RecordError> {
        Ok(self.store.list(owner).await?)
    }

    /// One record of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if `owner` has no such record.
    pub async fn get(&self, owner: AccountId, id: T::Id) -> Result<T, RecordError> {
        self.store.get(owner, id).await?.ok_or(RecordError::NotFound)
    }

    /// Validate `draft` and store it for `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Validation` with every failing field.
    pub async fn create(&self, owner: AccountId, draft: &T::Draft) -> Result<T, RecordError> {
        draft.validate()?;
        let record = self.store.create(owner, draft).await?;
        tracing::info!(table = T::TABLE, id = %record.id(), owner = %owner, "Record created");
        Ok(record)
    }

    /// Validate `draft` and replace the business fields of `id`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if `owner` has no such record and
    /// `RecordError::Validation` for invalid fields.
    pub async fn update(
        &self,
        owner: AccountId,
        id: T::Id,
        draft: &T::Draft,
    ) -> Result<T, RecordError> {
        draft.validate()?;
        let record = self
            .store
            .update(owner, id, draft)
            .await?
            .ok_or(RecordError::NotFound)?;
        tracing::info!(table = T::TABLE, id = %id, owner = %owner, "Record updated");
        Ok(record)
    }

    /// Delete record `id` of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if `owner` has no such record.
    pub async fn delete(&self, owner: AccountId, id: T::Id) -> Result<(), RecordError> {
        if !self.store.delete(owner, id).await? {
            return Err(RecordError::NotFound);
        }
        tracing::info!(table = T::TABLE, id = %id, owner = %owner, "Record deleted");
        Ok(())
    }

    /// Delete every record of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store fails.
    pub async fn purge(&self, owner: AccountId) -> Result<u64, RecordError> {
        let removed = self.store.purge(owner).await?;
        if removed > 0 {
            tracing::info!(table = T::TABLE, owner = %owner, removed, "Records purged");
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cadastro_core::ClientId;

    use super::*;
    use crate::db::MemoryRecordStore;
    use crate::models::{Client, ClientDraft};

    fn draft(name: &str) -> ClientDraft {
        ClientDraft {
            name: name.to_string(),
            document: "123.456.789-00".to_string(),
            email: "contato@exemplo.com".to_string(),
            phone: "11 99999-0000".to_string(),
            postal_code: Some("01310-100".to_string()),
            address: None,
        }
    }

    #[tokio::test]
    async fn test_create_validates_before_writing() {
        let store = MemoryRecordStore::<Client>::new();
        let records = OwnedRecords::new(&store);
        let owner = AccountId::new(1);

        let mut bad = draft("");
        bad.postal_code = Some("123".to_string());
        let Err(RecordError::Validation(errors)) = records.create(owner, &bad).await else {
            panic!("expected validation error");
        };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["cep", "nome"]);
        assert!(records.list(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let store = MemoryRecordStore::<Client>::new();
        let records = OwnedRecords::new(&store);
        let a = AccountId::new(1);
        let b = AccountId::new(2);

        let client = records.create(a, &draft("Ana")).await.unwrap();

        assert!(matches!(records.get(b, client.id).await, Err(RecordError::NotFound)));
        assert!(matches!(
            records.update(b, client.id, &draft("Bia")).await,
            Err(RecordError::NotFound)
        ));
        assert!(matches!(records.delete(b, client.id).await, Err(RecordError::NotFound)));
        assert_eq!(records.get(a, client.id).await.unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = MemoryRecordStore::<Client>::new();
        let records = OwnedRecords::new(&store);

        assert!(matches!(
            records.get(AccountId::new(1), ClientId::new(99)).await,
            Err(RecordError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_validates_and_replaces_fields() {
        let store = MemoryRecordStore::<Client>::new();
        let records = OwnedRecords::new(&store);
        let owner = AccountId::new(1);
        let client = records.create(owner, &draft("Ana")).await.unwrap();

        let mut bad = draft("Ana");
        bad.email = "nope".to_string();
        assert!(matches!(
            records.update(owner, client.id, &bad).await,
            Err(RecordError::Validation(_))
        ));

        let updated = records.update(owner, client.id, &draft("Ana Maria")).await.unwrap();
        assert_eq!(updated.name, "Ana Maria");
        assert_eq!(updated.created_at, client.created_at);
    }

    #[test]
    fn test_repository_errors_map_to_record_errors() {
        assert!(matches!(
            RecordError::from(RepositoryError::NotFound),
            RecordError::NotFound
        ));
        assert!(matches!(
            RecordError::from(RepositoryError::Conflict("stale".to_string())),
            RecordError::Conflict(_)
        ));
        assert!(matches!(
            RecordError::from(RepositoryError::DataCorruption("x".to_string())),
            RecordError::Repository(_)
        ));
    }
}
