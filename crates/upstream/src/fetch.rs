//! Downloading provider outputs.

use async_trait::async_trait;

use crate::http::ensure_success;

/// Errors from downloading an asset.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Download failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download of {url} returned {status}")]
    Status { url: String, status: u16 },
}

/// A downloaded asset body.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the origin, if any.
    pub content_type: Option<String>,
}

/// Retrieves the bytes behind a provider output URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, FetchError>;
}

/// [`AssetFetcher`] that performs a plain `GET`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success(response)
            .await
            .map_err(|(status, _)| FetchError::Status {
                url: url.to_string(),
                status,
            })?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        tracing::debug!(url, size = bytes.len(), "Downloaded asset");
        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}
