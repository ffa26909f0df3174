//! Route handlers for the gateway.

pub mod billing;
pub mod clients;
pub mod documents;
pub mod health;
pub mod messages;
pub mod sms;
pub mod stripe;
pub mod token;
pub mod voice;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Provider webhooks
        .route(voice::INBOUND_PATH, post(voice::inbound))
        .route(voice::OUTBOUND_PATH, post(voice::outbound))
        .route(sms::INBOUND_PATH, post(sms::inbound))
        .route(sms::STATUS_PATH, post(sms::status))
        .route(stripe::WEBHOOK_PATH, post(stripe::webhook))
        // Authenticated actions
        .route("/api/messages/send", post(messages::send))
        .route("/api/billing/checkout", post(billing::checkout))
        .route("/api/billing/portal", post(billing::portal))
        .route("/api/billing/access", get(billing::access_check))
        .route("/api/documents/analyze", post(documents::analyze))
        .route("/api/documents/latest", get(documents::latest))
        .route("/api/documents/sign", post(documents::sign))
        .route("/api/clients/invite", post(clients::invite))
        .route("/api/telephony/token", post(token::issue))
}
