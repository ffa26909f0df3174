//! Document analysis errors.

use thiserror::Error;

/// Errors from the blob store or the content-generation service.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The blob does not exist at the given path.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// Blob store call failed.
    #[error("blob store error: {0}")]
    Storage(String),

    /// Content-generation service call failed or timed out.
    #[error("content generation failed: {0}")]
    Upstream(String),
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
