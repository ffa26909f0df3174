//! Gateway error taxonomy and HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors surfaced by gateway handlers, mapped onto HTTP statuses in one
/// place. Webhook handlers that answer in call-control markup convert
/// these to a generic spoken response instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or invalid credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid credential, insufficient role/membership, or a vetoed action.
    #[error("{0}")]
    Forbidden(String),

    /// Malformed body, missing field, or disallowed parameter value.
    #[error("{0}")]
    InvalidRequest(String),

    /// Referenced resource absent.
    #[error("{0}")]
    NotFound(String),

    /// A provider call failed or timed out; webhook callers may retry.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Datastore failure.
    #[error(transparent)]
    Database(#[from] database::DatabaseError),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Database(database::DatabaseError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            GatewayError::Upstream(_) | GatewayError::Database(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

impl From<access::AccessError> for GatewayError {
    fn from(err: access::AccessError) -> Self {
        match err {
            access::AccessError::Unauthenticated(msg) => GatewayError::Unauthenticated(msg),
            access::AccessError::Forbidden(msg) => GatewayError::Forbidden(msg),
            access::AccessError::Provider(msg) => GatewayError::Internal(msg),
            access::AccessError::Database(err) => GatewayError::Database(err),
        }
    }
}

impl From<telephony::TelephonyError> for GatewayError {
    fn from(err: telephony::TelephonyError) -> Self {
        GatewayError::Upstream(err.to_string())
    }
}

impl From<payments::PaymentsError> for GatewayError {
    fn from(err: payments::PaymentsError) -> Self {
        match err {
            payments::PaymentsError::InvalidEvent(msg)
            | payments::PaymentsError::MalformedSignature(msg) => {
                GatewayError::InvalidRequest(msg)
            }
            other => GatewayError::Upstream(other.to_string()),
        }
    }
}

impl From<doc_analysis::AnalysisError> for GatewayError {
    fn from(err: doc_analysis::AnalysisError) -> Self {
        match err {
            doc_analysis::AnalysisError::BlobNotFound(path) => GatewayError::NotFound(path),
            other => GatewayError::Upstream(other.to_string()),
        }
    }
}

/// Result type for gateway handlers.
pub type Result<T> = std::result::Result<T, GatewayError>;
