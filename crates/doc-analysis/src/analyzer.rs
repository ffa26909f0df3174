//! Opaque content-generation service used for structured extraction.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// Extracts structured data from a document.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Send document bytes and mime type; receive structured JSON.
    ///
    /// Failures propagate as [`AnalysisError::Upstream`], never swallowed.
    async fn analyze(&self, bytes: &[u8], mime_type: &str) -> Result<Value>;
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    result: Value,
}

/// HTTP client for the content-generation service.
pub struct HttpAnalyzer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpAnalyzer {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, bytes: &[u8], mime_type: &str) -> Result<Value> {
        debug!(mime_type, size = bytes.len(), "requesting extraction");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "document": BASE64.encode(bytes),
                "mime_type": mime_type,
            }))
            .send()
            .await
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::Upstream(format!(
                "service returned {}",
                response.status()
            )));
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;

        Ok(parsed.result)
    }
}
