//! Product lifecycle with image side effects.
//!
//! Blob storage and the record store are not transactional. The orders below
//! are fixed:
//!
//! - create: validate, upload (failure means no image), insert.
//! - update: load, validate, delete the old blob if a new image came in,
//!   upload the new one, write. A failed upload leaves the product without
//!   an image.
//! - delete: load, delete the blob (best effort), delete the row.
//!
//! An upload followed by a failed row write leaves an orphaned blob. Nothing
//! reconciles those.

use cadastro_core::{AccountId, ProductId};

use crate::db::RecordStore;
use crate::models::{Product, ProductDraft};
use crate::services::records::{OwnedRecords, RecordError};
use crate::storage::{BlobGateway, ImageUpload};
use crate::validation::Validate;

/// Product writes that keep the image reference in step with blob storage.
pub struct ProductService<'a> {
    records: OwnedRecords<'a, Product>,
    blobs: &'a BlobGateway,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore<Product>, blobs: &'a BlobGateway) -> Self {
        Self {
            records: OwnedRecords::new(store),
            blobs,
        }
    }

    /// All products of `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store fails.
    pub async fn list(&self, owner: AccountId) -> Result<Vec<Product>, RecordError> {
        self.records.list(owner).await
    }

    /// One product of `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if `owner` has no such product.
    pub async fn get(&self, owner: AccountId, id: ProductId) -> Result<Product, RecordError> {
        self.records.get(owner, id).await
    }

    /// Create a product, uploading `image` first when present.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Validation` for invalid fields; nothing is
    /// uploaded in that case.
    pub async fn create(
        &self,
        owner: AccountId,
        mut draft: ProductDraft,
        image: Option<&ImageUpload>,
    ) -> Result<Product, RecordError> {
        draft.validate()?;

        draft.image_ref = match image {
            Some(image) => self.blobs.upload(image).await,
            None => None,
        };

        self.records.create(owner, &draft).await
    }

    /// Replace the fields of a product and, when `image` is present, its image.
    ///
    /// Without a new image the stored reference is kept.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if `owner` has no such product and
    /// `RecordError::Validation` for invalid fields.
    pub async fn update(
        &self,
        owner: AccountId,
        id: ProductId,
        mut draft: ProductDraft,
        image: Option<&ImageUpload>,
    ) -> Result<Product, RecordError> {
        let existing = self.records.get(owner, id).await?;
        draft.validate()?;

        draft.image_ref = match image {
            Some(image) => {
                if let Some(previous) = existing.image_ref.as_deref() {
                    self.blobs.delete(previous).await;
                }
                self.blobs.upload(image).await
            }
            None => existing.image_ref,
        };

        self.records.update(owner, id, &draft).await
    }

    /// Delete a product and, best effort, its image.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if `owner` has no such product.
    pub async fn delete(&self, owner: AccountId, id: ProductId) -> Result<(), RecordError> {
        let existing = self.records.get(owner, id).await?;

        if let Some(reference) = existing.image_ref.as_deref() {
            self.blobs.delete(reference).await;
        }

        self.records.delete(owner, id).await
    }

    /// Delete every product of `owner` together with their images.
    ///
    /// Used when the account itself goes away.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Repository` if the store fails.
    pub async fn purge(&self, owner: AccountId) -> Result<u64, RecordError> {
        for product in self.records.list(owner).await? {
            if let Some(reference) = product.image_ref.as_deref() {
                self.blobs.delete(reference).await;
            }
        }
        self.records.purge(owner).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Bytes;
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::MemoryRecordStore;
    use crate::storage::{BlobBackend, StorageError};

    #[derive(Default)]
    struct RecordingBackend {
        puts: AtomicUsize,
        removed: Mutex<Vec<String>>,
        fail_uploads: AtomicBool,
        fail_removes: AtomicBool,
    }

    #[async_trait]
    impl BlobBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn put(&self, object_name: &str, _: &ImageUpload) -> Result<String, StorageError> {
            if self.fail_uploads.load(Ordering::SeqCst) {
                return Err(StorageError::Rejected {
                    status: 503,
                    body: String::new(),
                });
            }
            self.puts.fetch_add(1, Ordering::SeqCst);
            Ok(format!("mem/{object_name}"))
        }

        async fn remove(&self, reference: &str) -> Result<(), StorageError> {
            self.removed.lock().unwrap().push(reference.to_string());
            if self.fail_removes.load(Ordering::SeqCst) {
                return Err(StorageError::Misconfigured("down".to_string()));
            }
            Ok(())
        }
    }

    struct Fixture {
        store: MemoryRecordStore<Product>,
        backend: Arc<RecordingBackend>,
        gateway: BlobGateway,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = Arc::new(RecordingBackend::default());
            let gateway = BlobGateway::new(backend.clone(), 1024);
            Self {
                store: MemoryRecordStore::new(),
                backend,
                gateway,
            }
        }

        fn service(&self) -> ProductService<'_> {
            ProductService::new(&self.store, &self.gateway)
        }

        fn removed(&self) -> Vec<String> {
            self.backend.removed.lock().unwrap().clone()
        }
    }

    fn widget() -> ProductDraft {
        ProductDraft {
            description: "Widget".to_string(),
            quantity: 5,
            price: Decimal::new(999, 2),
            supplier_name: Some("Acme".to_string()),
            image_ref: None,
        }
    }

    fn image(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"png"),
        }
    }

    #[tokio::test]
    async fn test_widget_lifecycle() {
        let fx = Fixture::new();
        let products = fx.service();
        let owner = AccountId::new(1);

        let created = products.create(owner, widget(), None).await.unwrap();
        assert_eq!(created.image_ref, None);
        assert_eq!(created.quantity, 5);

        let updated = products
            .update(owner, created.id, widget(), Some(&image("a.png")))
            .await
            .unwrap();
        let reference = updated.image_ref.clone().unwrap();
        assert!(reference.ends_with(".png"));
        assert!(fx.removed().is_empty());

        products.delete(owner, created.id).await.unwrap();
        assert!(matches!(
            products.get(owner, created.id).await,
            Err(RecordError::NotFound)
        ));
        assert_eq!(fx.removed(), vec![reference]);
    }

    #[tokio::test]
    async fn test_replacing_image_deletes_previous_reference() {
        let fx = Fixture::new();
        let products = fx.service();
        let owner = AccountId::new(1);

        let created = products
            .create(owner, widget(), Some(&image("first.jpg")))
            .await
            .unwrap();
        let first = created.image_ref.clone().unwrap();

        let updated = products
            .update(owner, created.id, widget(), Some(&image("second.jpg")))
            .await
            .unwrap();
        let second = updated.image_ref.unwrap();

        assert_ne!(first, second);
        assert_eq!(fx.removed(), vec![first]);
    }

    #[tokio::test]
    async fn test_update_without_image_keeps_reference() {
        let fx = Fixture::new();
        let products = fx.service();
        let owner = AccountId::new(1);

        let created = products
            .create(owner, widget(), Some(&image("a.png")))
            .await
            .unwrap();

        let mut draft = widget();
        draft.quantity = 7;
        let updated = products.update(owner, created.id, draft, None).await.unwrap();

        assert_eq!(updated.quantity, 7);
        assert_eq!(updated.image_ref, created.image_ref);
        assert!(fx.removed().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_on_create_saves_without_image() {
        let fx = Fixture::new();
        fx.backend.fail_uploads.store(true, Ordering::SeqCst);

        let created = fx
            .service()
            .create(AccountId::new(1), widget(), Some(&image("a.png")))
            .await
            .unwrap();

        assert_eq!(created.image_ref, None);
    }

    #[tokio::test]
    async fn test_failed_upload_on_update_leaves_no_image() {
        let fx = Fixture::new();
        let products = fx.service();
        let owner = AccountId::new(1);
        let created = products
            .create(owner, widget(), Some(&image("a.png")))
            .await
            .unwrap();

        fx.backend.fail_uploads.store(true, Ordering::SeqCst);
        let updated = products
            .update(owner, created.id, widget(), Some(&image("b.png")))
            .await
            .unwrap();

        assert_eq!(updated.image_ref, None);
        assert_eq!(fx.removed(), vec![created.image_ref.unwrap()]);
    }

    #[tokio::test]
    async fn test_blob_delete_failure_does_not_block_row_delete() {
        let fx = Fixture::new();
        let products = fx.service();
        let owner = AccountId::new(1);
        let created = products
            .create(owner, widget(), Some(&image("a.png")))
            .await
            .unwrap();

        fx.backend.fail_removes.store(true, Ordering::SeqCst);
        products.delete(owner, created.id).await.unwrap();

        assert_eq!(fx.removed().len(), 1);
        assert!(products.list(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_draft_uploads_nothing() {
        let fx = Fixture::new();
        let mut draft = widget();
        draft.description = String::new();

        let result = fx
            .service()
            .create(AccountId::new(1), draft, Some(&image("a.png")))
            .await;

        assert!(matches!(result, Err(RecordError::Validation(_))));
        assert_eq!(fx.backend.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_owner_cannot_touch_product_or_image() {
        let fx = Fixture::new();
        let products = fx.service();
        let a = AccountId::new(1);
        let b = AccountId::new(2);
        let created = products
            .create(a, widget(), Some(&image("a.png")))
            .await
            .unwrap();

        assert!(matches!(
            products.update(b, created.id, widget(), Some(&image("b.png"))).await,
            Err(RecordError::NotFound)
        ));
        assert!(matches!(products.delete(b, created.id).await, Err(RecordError::NotFound)));
        assert!(fx.removed().is_empty());
        assert_eq!(fx.backend.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_purge_removes_images_and_rows() {
        let fx = Fixture::new();
        let products = fx.service();
        let owner = AccountId::new(1);
        let other = AccountId::new(2);

        products.create(owner, widget(), Some(&image("a.png"))).await.unwrap();
        products.create(owner, widget(), None).await.unwrap();
        products.create(other, widget(), None).await.unwrap();

        assert_eq!(products.purge(owner).await.unwrap(), 2);
        assert_eq!(fx.removed().len(), 1);
        assert!(products.list(owner).await.unwrap().is_empty());
        assert_eq!(products.list(other).await.unwrap().len(), 1);
    }
}
