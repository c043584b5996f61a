//! Product image storage.
//!
//! [`BlobGateway`] is the only entry point the rest of the server uses. It
//! wraps one [`BlobBackend`] chosen at startup from [`StorageConfig`]:
//!
//! - [`LocalBackend`] writes files under the uploads root and returns
//!   `uploads/<name>` references.
//! - [`RemoteBackend`] pushes objects to a Supabase-compatible storage API
//!   and returns public URLs.
//!
//! Gateway failures never propagate. `upload` degrades to `None` and
//! `delete` to `false`, with the cause logged.

mod local;
mod remote;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageConfig, StorageMode};

/// Content type used when the upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const MAX_EXTENSION_LEN: usize = 10;

/// Errors raised by storage backends. The gateway logs them and degrades.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload is empty")]
    EmptyUpload,

    #[error("upload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage API rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("reference was not produced by this backend: {0}")]
    ForeignReference(String),

    #[error("storage misconfigured: {0}")]
    Misconfigured(String),
}

/// An image received with a product write.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the client; only its extension is kept.
    pub file_name: String,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Content type to store the object with.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// A place product images can be written to and removed from.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Store `upload` as `object_name`, returning its external reference.
    async fn put(&self, object_name: &str, upload: &ImageUpload) -> Result<String, StorageError>;

    /// Remove the blob behind `reference`.
    ///
    /// Succeeds when the blob is gone afterwards, including when it was
    /// already missing.
    async fn remove(&self, reference: &str) -> Result<(), StorageError>;
}

/// Collision-resistant object name: `yyyyMMddHHmmss_<8 hex><.ext>`.
///
/// The extension comes from the client file name and is kept only when it is
/// 1-10 ASCII alphanumerics; it is lower-cased.
#[must_use]
pub fn object_name(file_name: &str, now: DateTime<Utc>) -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}_{suffix}{extension}", now.format("%Y%m%d%H%M%S"))
}

/// Upload and delete product images through the configured backend.
#[derive(Clone)]
pub struct BlobGateway {
    backend: Arc<dyn BlobBackend>,
    max_bytes: usize,
}

impl BlobGateway {
    /// Wrap a backend, rejecting uploads over `max_bytes`.
    #[must_use]
    pub fn new(backend: Arc<dyn BlobBackend>, max_bytes: usize) -> Self {
        Self { backend, max_bytes }
    }

    /// Build the gateway selected by `config.mode`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Misconfigured` if remote mode lacks its settings,
    /// or `StorageError::Http` if the HTTP client cannot be built.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let backend: Arc<dyn BlobBackend> = match config.mode {
            StorageMode::Local => Arc::new(LocalBackend::new(config.uploads_dir.clone())),
            StorageMode::Remote => {
                let remote = config.remote.as_ref().ok_or_else(|| {
                    StorageError::Misconfigured("remote mode without SUPABASE_URL".to_string())
                })?;
                Arc::new(RemoteBackend::new(remote)?)
            }
        };

        tracing::info!(backend = backend.name(), "Image storage initialized");
        Ok(Self::new(backend, config.max_upload_bytes))
    }

    /// Name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Store an image and return its external reference.
    ///
    /// Returns `None` on any failure; the caller treats that as "no image".
    pub async fn upload(&self, upload: &ImageUpload) -> Option<String> {
        match self.try_upload(upload).await {
            Ok(reference) => {
                tracing::info!(
                    backend = self.backend.name(),
                    reference = %reference,
                    size = upload.bytes.len(),
                    "Image stored"
                );
                Some(reference)
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "Image upload failed, continuing without image"
                );
                None
            }
        }
    }

    async fn try_upload(&self, upload: &ImageUpload) -> Result<String, StorageError> {
        if upload.bytes.is_empty() {
            return Err(StorageError::EmptyUpload);
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: upload.bytes.len(),
                max: self.max_bytes,
            });
        }

        let name = object_name(&upload.file_name, Utc::now());
        self.backend.put(&name, upload).await
    }

    /// Remove the image behind `reference`.
    ///
    /// Returns `true` when the blob is gone afterwards (including when it
    /// was already missing) and `false` on failure.
    pub async fn delete(&self, reference: &str) -> bool {
        match self.backend.remove(reference).await {
            Ok(()) => {
                tracing::info!(backend = self.backend.name(), reference, "Image deleted");
                true
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    reference,
                    error = %e,
                    "Image delete failed"
                );
                false
            }
        }
    }
}
