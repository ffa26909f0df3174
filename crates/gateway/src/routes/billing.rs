//! Checkout, portal, and entitlement endpoints.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use payments::CheckoutMode;

use crate::auth::{authenticate, authenticate_for_client};
use crate::error::{GatewayError, Result};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub client_id: String,
    pub price_id: String,
    /// `subscription` (default) or `payment`.
    pub mode: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub url: String,
}

/// Create a checkout session for a tenant.
pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<SessionResponse>> {
    let pool = state.db.pool();
    let caller = authenticate(&state, &headers).await?;
    access::require_internal(caller.role)?;
    access::authorize_client_access(pool, &caller.principal.id, caller.role, &req.client_id)
        .await?;

    // Only allow-listed prices are purchasable.
    if !state.config.allowed_price_ids.contains(&req.price_id) {
        return Err(GatewayError::InvalidRequest(format!(
            "price {} is not purchasable",
            req.price_id
        )));
    }

    let mode = match req.mode.as_deref() {
        None | Some("subscription") => CheckoutMode::Subscription,
        Some("payment") => CheckoutMode::Payment,
        Some(other) => {
            return Err(GatewayError::InvalidRequest(format!(
                "unknown checkout mode: {other}"
            )))
        }
    };

    let customer_id = ensure_customer(&state, &req.client_id, Some(&caller.principal.email))
        .await?;

    let base = state.config.public_base_url.trim_end_matches('/');
    let session = state
        .stripe
        .create_checkout_session(
            &customer_id,
            &req.client_id,
            &req.price_id,
            mode,
            &format!("{base}/billing/success"),
            &format!("{base}/billing/cancel"),
        )
        .await?;

    info!(client_id = %req.client_id, session_id = %session.id, "checkout session created");
    Ok(Json(SessionResponse { url: session.url }))
}

#[derive(Deserialize)]
pub struct PortalRequest {
    pub client_id: String,
}

/// Create a billing portal session for a tenant.
pub async fn portal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PortalRequest>,
) -> Result<Json<SessionResponse>> {
    let pool = state.db.pool();
    let caller = authenticate(&state, &headers).await?;
    access::require_internal(caller.role)?;
    access::authorize_client_access(pool, &caller.principal.id, caller.role, &req.client_id)
        .await?;

    let customer = database::billing::customer_for_client(pool, &req.client_id)
        .await?
        .ok_or_else(|| {
            GatewayError::NotFound(format!("no billing customer for client {}", req.client_id))
        })?;

    let base = state.config.public_base_url.trim_end_matches('/');
    let session = state
        .stripe
        .create_portal_session(&customer.stripe_customer_id, &format!("{base}/billing"))
        .await?;

    Ok(Json(SessionResponse { url: session.url }))
}

#[derive(Deserialize)]
pub struct AccessQuery {
    pub client_id: String,
}

#[derive(Serialize)]
pub struct AccessResponse {
    pub has_access: bool,
}

/// Derived entitlement for the tenant.
pub async fn access_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessResponse>> {
    let caller = authenticate_for_client(&state, &headers, &query.client_id).await?;

    let has_access = access::has_access(
        state.db.pool(),
        &caller.principal.id,
        caller.role,
        &query.client_id,
    )
    .await?;

    Ok(Json(AccessResponse { has_access }))
}

/// Get the cached billing customer or lazily create one, stamping the
/// tenant id into the provider-side metadata.
async fn ensure_customer(
    state: &AppState,
    client_id: &str,
    email: Option<&str>,
) -> Result<String> {
    let pool = state.db.pool();

    if let Some(existing) = database::billing::customer_for_client(pool, client_id).await? {
        return Ok(existing.stripe_customer_id);
    }

    let created = state.stripe.create_customer(client_id, email).await?;
    database::billing::upsert_customer(pool, client_id, &created.id).await?;
    Ok(created.id)
}
