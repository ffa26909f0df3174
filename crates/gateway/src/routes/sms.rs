//! Inbound SMS and delivery-status webhooks.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use database::models::SmsMessage;

use crate::error::Result;
use crate::state::AppState;
use crate::webhook::{param, parse_form, received, require_param, verify_telephony_signature};

pub const INBOUND_PATH: &str = "/webhooks/sms/inbound";
pub const STATUS_PATH: &str = "/webhooks/sms/status";

/// Inbound SMS webhook.
pub async fn inbound(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    match handle_inbound(&state, &headers, &body).await {
        Ok(ack) => ack.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_inbound(
    state: &AppState,
    headers: &HeaderMap,
    body: &str,
) -> Result<Json<Value>> {
    let pool = state.db.pool();
    let params = parse_form(body)?;
    verify_telephony_signature(state, INBOUND_PATH, &params, headers)?;

    let message_sid = require_param(&params, "MessageSid")?;
    let from = require_param(&params, "From")?;
    let to = require_param(&params, "To")?;
    let text = param(&params, "Body").unwrap_or_default();

    // The ledger gates every side effect below; a redelivery stops here.
    let fresh =
        database::ledger::record_if_new(pool, "twilio", "sms_inbound", message_sid, body).await?;
    if !fresh {
        return Ok(received());
    }

    // The delivery is durably recorded either way; an unconfigured number
    // stops further writes but still acknowledges.
    let Some(settings) = database::telephony::settings_for_number(pool, to).await? else {
        warn!(to, message_sid, "inbound SMS for unconfigured number");
        return Ok(received());
    };
    let client_id = settings.client_id;

    // Best-effort contact correlation by sender number.
    let contact = database::contact::find_by_phone(pool, &client_id, from).await?;

    let thread_id = database::sms::upsert_thread(pool, &client_id, from).await?;
    let message = SmsMessage {
        id: Uuid::new_v4().to_string(),
        thread_id,
        provider_sid: message_sid.to_string(),
        direction: "inbound".to_string(),
        body: text.to_string(),
        status: "received".to_string(),
        error_code: None,
        sent_by: None,
        created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    database::sms::insert_message(pool, &message).await?;

    let detail = contact
        .map(|c| format!("contact={}", c.id))
        .unwrap_or_else(|| format!("from={from}"));
    database::audit::write(pool, &client_id, "system", "sms_inbound", Some(&detail)).await?;

    info!(message_sid, client_id = %client_id, "inbound SMS recorded");
    Ok(received())
}

/// Delivery-status webhook. Each distinct status transition for a message
/// sid is applied once.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    match handle_status(&state, &headers, &body).await {
        Ok(ack) => ack.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_status(
    state: &AppState,
    headers: &HeaderMap,
    body: &str,
) -> Result<Json<Value>> {
    let pool = state.db.pool();
    let params = parse_form(body)?;
    verify_telephony_signature(state, STATUS_PATH, &params, headers)?;

    let message_sid = require_param(&params, "MessageSid")?;
    let message_status = require_param(&params, "MessageStatus")?;
    let error_code = param(&params, "ErrorCode");

    let key = database::ledger::status_key(message_sid, message_status);
    let fresh = database::ledger::record_if_new(pool, "twilio", "sms_status", &key, body).await?;
    if !fresh {
        return Ok(received());
    }

    let applied =
        database::sms::update_message_status(pool, message_sid, message_status, error_code).await?;
    if !applied {
        // Unknown sid is a no-op, not an error.
        warn!(message_sid, message_status, "status update for unknown message");
    }

    Ok(received())
}
