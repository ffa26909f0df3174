//! Opaque blob store, keyed by `tenants/<client_id>/...` paths.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// Fetches stored blobs and issues time-limited read URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob's bytes. Fails with [`AnalysisError::BlobNotFound`]
    /// when nothing exists at the path.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;

    /// Issue a signed read URL that expires after `expires_secs`. Callers
    /// must re-request rather than cache the URL.
    async fn signed_url(&self, path: &str, expires_secs: u64) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// HTTP blob store client against an object-storage API.
pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, bucket: &str, service_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AnalysisError::Storage(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        debug!(path, "fetching blob");
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AnalysisError::Storage(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AnalysisError::BlobNotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(AnalysisError::Storage(format!(
                "store returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::Storage(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn signed_url(&self, path: &str, expires_secs: u64) -> Result<String> {
        debug!(path, expires_secs, "issuing signed url");
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({ "expiresIn": expires_secs }))
            .send()
            .await
            .map_err(|e| AnalysisError::Storage(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AnalysisError::BlobNotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(AnalysisError::Storage(format!(
                "store returned {}",
                response.status()
            )));
        }

        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Storage(e.to_string()))?;

        Ok(format!("{}{}", self.base_url, signed.signed_url))
    }
}
