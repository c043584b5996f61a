//! Supabase Storage backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;

use super::{BlobBackend, ImageUpload, StorageError};
use crate::config::RemoteStorageConfig;

/// Request timeout for every storage call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stores images as objects in a Supabase Storage bucket.
///
/// Objects are written to `{bucket}/{prefix}/{name}` and exposed through the
/// bucket's public URL, which is what gets stored on the product.
#[derive(Clone)]
pub struct RemoteBackend {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    prefix: String,
}

impl RemoteBackend {
    /// Build a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Misconfigured` if the key is not a valid header
    /// value, or `StorageError::Http` if the client fails to build.
    pub fn new(config: &RemoteStorageConfig) -> Result<Self, StorageError> {
        let key = config.api_key.expose_secret();
        let mut headers = HeaderMap::new();

        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| StorageError::Misconfigured("storage key is not a valid header".to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let mut apikey = HeaderValue::from_str(key)
            .map_err(|_| StorageError::Misconfigured("storage key is not a valid header".to_string()))?;
        apikey.set_sensitive(true);
        headers.insert("apikey", apikey);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            prefix: config.object_prefix.trim_matches('/').to_string(),
        })
    }

    fn object_key(&self, object_name: &str) -> String {
        if self.prefix.is_empty() {
            object_name.to_string()
        } else {
            format!("{}/{object_name}", self.prefix)
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{key}", self.base_url, self.bucket)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{key}", self.base_url, self.bucket)
    }

    /// Recover the object key from a public URL.
    ///
    /// The key is everything after the last `{bucket}/` segment. References
    /// pointing at another host are refused.
    fn key_from_reference<'r>(&self, reference: &'r str) -> Result<&'r str, StorageError> {
        let foreign = || StorageError::ForeignReference(reference.to_string());

        if !reference.starts_with(&format!("{}/", self.base_url)) {
            return Err(foreign());
        }

        let marker = format!("{}/", self.bucket);
        let (_, key) = reference.rsplit_once(&marker).ok_or_else(foreign)?;

        if key.is_empty() || key.split('/').any(|segment| segment == "..") {
            return Err(foreign());
        }
        Ok(key)
    }
}

/// Supabase answers a missing object with either 404 or a 400 whose body
/// names `not_found`.
fn is_missing_object(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST && body.contains("not_found"))
}

#[async_trait]
impl BlobBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn put(&self, object_name: &str, upload: &ImageUpload) -> Result<String, StorageError> {
        let key = self.object_key(object_name);

        let response = self
            .client
            .post(self.object_url(&key))
            .header(CONTENT_TYPE, upload.content_type())
            .body(upload.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(self.public_url(&key))
    }

    async fn remove(&self, reference: &str) -> Result<(), StorageError> {
        let key = self.key_from_reference(reference)?;

        let response = self.client.delete(self.object_url(key)).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if is_missing_object(status, &body) {
            tracing::debug!(key, "Storage object already gone");
            return Ok(());
        }

        Err(StorageError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
