//! Inbound and outbound voice webhooks.
//!
//! Both answer in call-control markup. Failures after signature
//! verification never leak configuration or internals to the phone caller;
//! they collapse to a generic spoken "unavailable" response with a logged
//! reason.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

use database::models::Call;
use telephony::{twiml, VoiceResponse};

use crate::error::Result;
use crate::state::AppState;
use crate::webhook::{param, parse_form, require_param, verify_telephony_signature};

/// Route paths; signature verification binds to the exact public URL.
pub const INBOUND_PATH: &str = "/webhooks/voice/inbound";
pub const OUTBOUND_PATH: &str = "/webhooks/voice/outbound";

fn xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        body,
    )
        .into_response()
}

/// Inbound call webhook: route the caller to the most recently active
/// agent, a fallback number, or a hangup message.
pub async fn inbound(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let params = match parse_form(&body) {
        Ok(params) => params,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = verify_telephony_signature(&state, INBOUND_PATH, &params, &headers) {
        return err.into_response();
    }

    match handle_inbound(&state, &params, &body).await {
        Ok(markup) => xml(markup),
        Err(err) => {
            // The caller hears a generic message, never the error.
            error!(error = %err, "inbound voice handling failed");
            xml(twiml::unavailable())
        }
    }
}

async fn handle_inbound(
    state: &AppState,
    params: &[(String, String)],
    raw_body: &str,
) -> Result<String> {
    let pool = state.db.pool();
    let call_sid = require_param(params, "CallSid")?;
    let from = require_param(params, "From")?;
    let to = require_param(params, "To")?;
    let call_status = param(params, "CallStatus").unwrap_or("ringing");

    // Tenant resolution keys on the dialed number. A miss is not an error
    // the caller may learn about.
    let Some(settings) = database::telephony::settings_for_number(pool, to).await? else {
        warn!(to, "inbound call for unconfigured number");
        return Ok(twiml::unavailable());
    };
    let client_id = settings.client_id.clone();

    let candidates = database::client::call_candidates(pool, &client_id).await?;
    let candidate_ids: Vec<String> = candidates.into_iter().map(|p| p.id).collect();
    let identity = database::telephony::most_recent_identity(pool, &candidate_ids).await?;

    let (markup, answered_by) = match (&identity, &settings.fallback_number) {
        (Some(identity), _) => (
            VoiceResponse::new()
                .dial_client(Some(from), &identity.client_identity)
                .build(),
            Some(identity.profile_id.clone()),
        ),
        (None, Some(fallback)) => (
            VoiceResponse::new().dial_number(Some(from), fallback).build(),
            None,
        ),
        (None, None) => (
            VoiceResponse::new()
                .say("No agents are available right now. Please call back later.")
                .hangup()
                .build(),
            None,
        ),
    };

    let call = Call {
        call_sid: call_sid.to_string(),
        client_id: client_id.clone(),
        direction: "inbound".to_string(),
        from_number: from.to_string(),
        to_number: to.to_string(),
        status: call_status.to_string(),
        answered_by,
    };
    database::telephony::upsert_call(pool, &call).await?;
    database::telephony::append_call_event(pool, call_sid, raw_body).await?;

    info!(call_sid, client_id = %client_id, "inbound call routed");
    Ok(markup)
}

/// Outbound client-initiated dial webhook: the softphone asks how to place
/// the call; the tenant's provisioned number becomes the caller id.
pub async fn outbound(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let params = match parse_form(&body) {
        Ok(params) => params,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = verify_telephony_signature(&state, OUTBOUND_PATH, &params, &headers) {
        return err.into_response();
    }

    match handle_outbound(&state, &params, &body).await {
        Ok(markup) => xml(markup),
        Err(err) => {
            error!(error = %err, "outbound voice handling failed");
            xml(twiml::unavailable())
        }
    }
}

async fn handle_outbound(
    state: &AppState,
    params: &[(String, String)],
    raw_body: &str,
) -> Result<String> {
    let pool = state.db.pool();
    let call_sid = require_param(params, "CallSid")?;
    let to = require_param(params, "To")?;
    // The tenant is explicit in the request, never inferred from the caller.
    let client_id = require_param(params, "ClientId")?;

    let Some(settings) = database::telephony::settings_for_client(pool, client_id).await? else {
        warn!(client_id, "outbound dial for tenant without telephony settings");
        return Ok(twiml::unavailable());
    };

    // Best-effort identity resolution; absence is not fatal.
    let placed_by = match param(params, "From").and_then(|f| f.strip_prefix("client:")) {
        Some(identity) => database::telephony::profile_for_identity(pool, identity).await?,
        None => None,
    };

    let call = Call {
        call_sid: call_sid.to_string(),
        client_id: client_id.to_string(),
        direction: "outbound".to_string(),
        from_number: settings.phone_number.clone(),
        to_number: to.to_string(),
        status: param(params, "CallStatus").unwrap_or("initiated").to_string(),
        answered_by: placed_by,
    };
    database::telephony::upsert_call(pool, &call).await?;
    database::telephony::append_call_event(pool, call_sid, raw_body).await?;

    info!(call_sid, client_id, "outbound call placed");
    Ok(VoiceResponse::new()
        .dial_number(Some(&settings.phone_number), to)
        .build())
}
