//! Softphone access-token issuance.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::authenticate;
use crate::error::Result;
use crate::state::AppState;

/// Token lifetime.
const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Deserialize)]
pub struct TokenRequest {
    pub client_id: String,
    /// The softphone identity to register for this agent.
    pub identity: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub identity: String,
}

/// Mint a softphone access token and refresh the caller's telephony
/// identity, which also marks them most-recently-active for inbound
/// routing.
pub async fn issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    let pool = state.db.pool();
    let caller = authenticate(&state, &headers).await?;
    access::require_internal(caller.role)?;
    access::authorize_client_access(pool, &caller.principal.id, caller.role, &req.client_id)
        .await?;

    database::telephony::touch_identity(pool, &caller.principal.id, &req.identity).await?;

    let token = state
        .token_signer
        .mint(&req.identity, TOKEN_TTL_SECS)
        .map_err(crate::error::GatewayError::from)?;

    info!(principal = %caller.principal.id, identity = %req.identity, "softphone token issued");
    Ok(Json(TokenResponse {
        token,
        identity: req.identity,
    }))
}
