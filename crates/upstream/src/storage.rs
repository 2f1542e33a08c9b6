//! Blob storage client for the Supabase Storage REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::http::{ensure_success, join_url};

/// Errors from the blob storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Object not found: {bucket}/{path}")]
    NotFound { bucket: String, path: String },
}

/// Object storage with signed read URLs.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload (or overwrite) an object.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Create a time-limited URL for reading an object.
    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// [`BlobStorage`] over `{SUPABASE_URL}/storage/v1`.
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStorage {
    /// * `base_url` - project URL, e.g. `https://xyz.supabase.co`.
    pub fn new(client: reqwest::Client, base_url: String, service_key: String) -> Self {
        Self {
            client,
            base_url,
            service_key,
        }
    }

    fn object_url(&self, prefix: &str, bucket: &str, path: &str) -> String {
        join_url(
            &self.base_url,
            &format!("storage/v1/object/{prefix}{bucket}/{path}"),
        )
    }
}

#[async_trait]
impl BlobStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.object_url("", bucket, path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        ensure_success(response)
            .await
            .map_err(|(status, body)| StorageError::Api { status, body })?;
        Ok(())
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let response = self
            .client
            .post(self.object_url("sign/", bucket, path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&serde_json::json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await?;

        let response = ensure_success(response)
            .await
            .map_err(|(status, body)| StorageError::Api { status, body })?;
        let signed: SignResponse = response.json().await?;

        // The API returns a path relative to `/storage/v1`.
        if signed.signed_url.starts_with("http") {
            Ok(signed.signed_url)
        } else {
            Ok(join_url(
                &join_url(&self.base_url, "storage/v1"),
                &signed.signed_url,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls() {
        let storage = SupabaseStorage::new(
            reqwest::Client::new(),
            "https://xyz.supabase.co/".into(),
            "key".into(),
        );
        assert_eq!(
            storage.object_url("", "workspace-temp", "u/j_0.png"),
            "https://xyz.supabase.co/storage/v1/object/workspace-temp/u/j_0.png"
        );
        assert_eq!(
            storage.object_url("sign/", "workspace-temp", "u/j_0.png"),
            "https://xyz.supabase.co/storage/v1/object/sign/workspace-temp/u/j_0.png"
        );
    }
}
