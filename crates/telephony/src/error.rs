//! Telephony provider errors.

use thiserror::Error;

/// Errors from the telephony provider integration.
#[derive(Debug, Error)]
pub enum TelephonyError {
    /// HTTP transport failure (includes timeouts).
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a non-success status.
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Token minting or signing failed.
    #[error("token error: {0}")]
    Token(String),
}

/// Result type for telephony operations.
pub type Result<T> = std::result::Result<T, TelephonyError>;
