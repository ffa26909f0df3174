//! Payment provider errors.

use thiserror::Error;

/// Errors from the payment provider integration.
#[derive(Debug, Error)]
pub enum PaymentsError {
    /// HTTP transport failure (includes timeouts).
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a non-success status.
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Signature header was present but structurally invalid.
    #[error("malformed signature header: {0}")]
    MalformedSignature(String),

    /// Event payload missing required fields or not valid JSON.
    #[error("invalid event payload: {0}")]
    InvalidEvent(String),
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentsError>;
