//! Caller-triggered outbound SMS.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use database::models::SmsMessage;
use telephony::SendFrom;

use crate::auth::authenticate;
use crate::error::{GatewayError, Result};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SendRequest {
    pub client_id: String,
    pub contact_id: String,
    pub body: String,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub message_id: String,
    pub provider_sid: String,
    pub status: String,
}

/// Send an SMS on behalf of a tenant.
///
/// Ordering is deliberate: role, membership, and both contact vetoes are
/// checked before the provider is ever called.
pub async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>> {
    let pool = state.db.pool();

    let caller = authenticate(&state, &headers).await?;
    access::require_internal(caller.role)?;
    access::authorize_client_access(pool, &caller.principal.id, caller.role, &req.client_id)
        .await?;

    let contact = database::contact::get_contact(pool, &req.client_id, &req.contact_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("contact {}", req.contact_id)))?;

    // Outbound vetoes, both fail closed.
    if database::consent::is_dnc(pool, &req.client_id, &contact.id).await? {
        return Err(GatewayError::Forbidden("contact is on the do-not-contact list".into()));
    }
    if let Some(consent) =
        database::consent::latest_consent(pool, &req.client_id, &contact.id, "sms").await?
    {
        if consent.status == "opted_out" {
            return Err(GatewayError::Forbidden("contact has opted out of SMS".into()));
        }
    }

    let to = contact
        .phone_number
        .as_deref()
        .ok_or_else(|| GatewayError::InvalidRequest("contact has no phone number".into()))?;

    // The shared messaging service takes precedence over the tenant number.
    let from = match &state.config.messaging_service_sid {
        Some(sid) => SendFrom::MessagingService(sid.clone()),
        None => {
            let settings = database::telephony::settings_for_client(pool, &req.client_id)
                .await?
                .ok_or_else(|| {
                    GatewayError::InvalidRequest("tenant has no sending number configured".into())
                })?;
            SendFrom::Number(settings.phone_number)
        }
    };

    let sent = state.sms.send_sms(&from, to, &req.body).await?;

    let thread_id = database::sms::upsert_thread(pool, &req.client_id, to).await?;
    let message = SmsMessage {
        id: Uuid::new_v4().to_string(),
        thread_id,
        provider_sid: sent.sid.clone(),
        direction: "outbound".to_string(),
        body: req.body.clone(),
        status: sent.status.clone(),
        error_code: None,
        sent_by: Some(caller.principal.id.clone()),
        created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    database::sms::insert_message(pool, &message).await?;

    database::audit::write(
        pool,
        &req.client_id,
        &caller.principal.id,
        "sms_outbound",
        Some(&format!("contact={} sid={}", contact.id, sent.sid)),
    )
    .await?;

    info!(client_id = %req.client_id, sid = %sent.sid, "outbound SMS sent");
    Ok(Json(SendResponse {
        message_id: message.id,
        provider_sid: sent.sid,
        status: sent.status,
    }))
}
