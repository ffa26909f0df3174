//! Shared plumbing for form-encoded webhook handlers.

use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::error::{GatewayError, Result};
use crate::state::AppState;

/// Signature header sent by the telephony provider.
pub const TWILIO_SIGNATURE_HEADER: &str = "X-Twilio-Signature";

/// Decode a form-encoded webhook body into its full parameter list.
///
/// The signature scheme covers every parameter, so this stays a list
/// rather than a typed struct; individual handlers pull required fields
/// with [`require_param`].
pub fn parse_form(body: &str) -> Result<Vec<(String, String)>> {
    serde_urlencoded::from_str(body)
        .map_err(|e| GatewayError::InvalidRequest(format!("malformed form body: {e}")))
}

/// Look up a parameter by name.
pub fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Look up a required parameter, failing with `InvalidRequest`.
pub fn require_param<'a>(params: &'a [(String, String)], name: &str) -> Result<&'a str> {
    param(params, name)
        .ok_or_else(|| GatewayError::InvalidRequest(format!("missing parameter: {name}")))
}

/// Verify the telephony signature for a webhook at `path`.
///
/// Runs before the idempotency ledger and before any tenant resolution; an
/// unverified request never touches the datastore.
pub fn verify_telephony_signature(
    state: &AppState,
    path: &str,
    params: &[(String, String)],
    headers: &HeaderMap,
) -> Result<()> {
    let signature = headers
        .get(TWILIO_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let url = state.config.webhook_url(path);
    if telephony::signature::verify(&state.config.twilio_auth_token, &url, params, signature) {
        Ok(())
    } else {
        tracing::warn!(path, "webhook signature verification failed");
        Err(GatewayError::Forbidden("invalid webhook signature".into()))
    }
}

/// The standard webhook acknowledgement body.
pub fn received() -> Json<Value> {
    Json(json!({ "received": true }))
}
