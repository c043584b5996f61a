//! Filesystem backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{BlobBackend, ImageUpload, StorageError};

/// Prefix of every reference this backend hands out.
pub const REFERENCE_PREFIX: &str = "uploads/";

/// Stores images as files directly under the uploads root.
///
/// References look like `uploads/<name>`; the root itself is served at
/// `/uploads`, so a reference doubles as a site-relative URL.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`. The directory is created on first write.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Uploads root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a reference to a path inside the root.
    ///
    /// Only the final path component is kept, so `uploads/../../etc/passwd`
    /// cannot escape the root.
    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let relative = reference
            .trim_start_matches('/')
            .strip_prefix(REFERENCE_PREFIX)
            .ok_or_else(|| StorageError::ForeignReference(reference.to_string()))?;

        let file_name = Path::new(relative)
            .file_name()
            .filter(|name| *name != "." && *name != "..")
            .ok_or_else(|| StorageError::ForeignReference(reference.to_string()))?;

        Ok(self.root.join(file_name))
    }
}

#[async_trait]
impl BlobBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, object_name: &str, upload: &ImageUpload) -> Result<String, StorageError> {
        fs::create_dir_all(&self.root).await?;
        fs::write(self.root.join(object_name), &upload.bytes).await?;

        tracing::debug!(path = %self.root.join(object_name).display(), "Wrote image file");
        Ok(format!("{REFERENCE_PREFIX}{object_name}"))
    }

    async fn remove(&self, reference: &str) -> Result<(), StorageError> {
        let path = self.resolve(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Image file already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
