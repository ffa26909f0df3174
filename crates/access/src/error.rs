//! Access errors.

use thiserror::Error;

/// Errors raised while resolving or authorizing a principal.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Missing, malformed, or provider-rejected credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Valid credential, insufficient role or membership.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The auth provider call itself failed.
    #[error("auth provider error: {0}")]
    Provider(String),

    /// A membership or billing lookup failed at the datastore.
    #[error(transparent)]
    Database(#[from] database::DatabaseError),
}

/// Result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
