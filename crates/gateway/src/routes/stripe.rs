//! Payment provider webhook processor.
//!
//! Signature verification runs over the raw body before any JSON parsing;
//! the idempotency ledger is keyed by the provider event id alone; tenant
//! resolution prefers the stored customer mapping and falls back to event
//! metadata. Unresolvable tenants are logged and acknowledged — retrying
//! cannot fix an unmapped customer.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use database::models::{Payment, Subscription};
use payments::events::{CheckoutSession, Invoice, Metadata, PaymentIntent, SubscriptionObject};
use payments::{Event, EventKind};

use crate::error::{GatewayError, Result};
use crate::state::AppState;
use crate::webhook::received;

pub const WEBHOOK_PATH: &str = "/webhooks/stripe";

/// Signature header sent by the payment provider.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(&state, &headers, &body).await {
        Ok(ack) => ack.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Json<Value>> {
    let pool = state.db.pool();

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::Forbidden("missing signature header".into()))?;

    let verified = payments::signature::verify(&state.config.stripe_webhook_secret, body, signature)
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
    if !verified {
        warn!("payment webhook signature verification failed");
        return Err(GatewayError::Forbidden("invalid webhook signature".into()));
    }

    let event = Event::from_payload(body)
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

    // Global one-time registration by event id; the type is informational.
    let raw = String::from_utf8_lossy(body);
    let fresh = database::ledger::record_if_new(pool, "stripe", "event", &event.id, &raw).await?;
    if !fresh {
        return Ok(received());
    }

    let kind = event
        .kind()
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

    match kind {
        EventKind::CheckoutCompleted(session) => checkout_completed(pool, &session).await?,
        EventKind::SubscriptionChanged(sub) => subscription_changed(pool, &sub, None).await?,
        EventKind::SubscriptionDeleted(sub) => {
            subscription_changed(pool, &sub, Some("canceled")).await?
        }
        EventKind::InvoicePaid(invoice) => invoice_outcome(pool, &invoice, "active").await?,
        EventKind::InvoicePaymentFailed(invoice) => {
            invoice_outcome(pool, &invoice, "past_due").await?
        }
        EventKind::PaymentIntentOutcome(intent) => payment_outcome(pool, &intent).await?,
        EventKind::Other => {
            info!(event_type = %event.event_type, "ignoring unhandled event type");
        }
    }

    Ok(received())
}

/// Resolve the owning tenant: stored customer mapping first, event metadata
/// second. When both exist and disagree, the stored mapping wins and the
/// disagreement is logged for alerting.
async fn resolve_client(
    pool: &SqlitePool,
    customer: Option<&str>,
    metadata: &Metadata,
) -> Result<Option<String>> {
    let mapped = match customer {
        Some(customer_id) => database::billing::client_for_customer(pool, customer_id).await?,
        None => None,
    };

    match (mapped, metadata.client_id.as_deref()) {
        (Some(mapped), Some(stamped)) if mapped != stamped => {
            error!(
                mapped_client = %mapped,
                metadata_client = %stamped,
                "customer mapping and event metadata disagree on tenant"
            );
            Ok(Some(mapped))
        }
        (Some(mapped), _) => Ok(Some(mapped)),
        (None, Some(stamped)) => Ok(Some(stamped.to_string())),
        (None, None) => Ok(None),
    }
}

async fn checkout_completed(pool: &SqlitePool, session: &CheckoutSession) -> Result<()> {
    let Some(client_id) = resolve_client(pool, session.customer.as_deref(), &session.metadata)
        .await?
    else {
        warn!(session_id = %session.id, "checkout completed for unresolvable tenant");
        return Ok(());
    };

    if let Some(customer) = &session.customer {
        database::billing::upsert_customer(pool, &client_id, customer).await?;
    }

    // Subscription details arrive on the subscription lifecycle event; the
    // payment-mode session settles its payment intent here.
    if session.mode == "payment" {
        if let Some(payment_intent) = &session.payment_intent {
            let payment = Payment {
                stripe_payment_intent_id: payment_intent.clone(),
                client_id: client_id.clone(),
                status: "paid".to_string(),
                amount: None,
                currency: None,
            };
            database::billing::upsert_payment(pool, &payment).await?;
        }
    }

    info!(session_id = %session.id, client_id = %client_id, mode = %session.mode, "checkout completed");
    Ok(())
}

async fn subscription_changed(
    pool: &SqlitePool,
    sub: &SubscriptionObject,
    status_override: Option<&str>,
) -> Result<()> {
    let Some(client_id) = resolve_client(pool, Some(&sub.customer), &sub.metadata).await? else {
        warn!(subscription_id = %sub.id, "subscription event for unresolvable tenant");
        return Ok(());
    };

    database::billing::upsert_customer(pool, &client_id, &sub.customer).await?;

    let period_end = sub.current_period_end.and_then(|ts| {
        chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
    });

    let record = Subscription {
        stripe_subscription_id: sub.id.clone(),
        client_id: client_id.clone(),
        status: status_override.unwrap_or(&sub.status).to_string(),
        price_id: sub.price_id().map(str::to_string),
        current_period_end: period_end,
        cancel_at_period_end: sub.cancel_at_period_end,
    };
    database::billing::upsert_subscription(pool, &record).await?;

    info!(subscription_id = %sub.id, client_id = %client_id, status = %record.status, "subscription upserted");
    Ok(())
}

async fn invoice_outcome(pool: &SqlitePool, invoice: &Invoice, new_status: &str) -> Result<()> {
    let Some(subscription_id) = &invoice.subscription else {
        info!(invoice_id = %invoice.id, "invoice without subscription; nothing to update");
        return Ok(());
    };

    // The invoice only narrows an already-known subscription's status; the
    // lifecycle event is the row's creator.
    let Some(mut existing) = database::billing::get_subscription(pool, subscription_id).await?
    else {
        warn!(subscription_id, invoice_id = %invoice.id, "invoice for unknown subscription");
        return Ok(());
    };

    existing.status = new_status.to_string();
    database::billing::upsert_subscription(pool, &existing).await?;

    info!(subscription_id, status = new_status, "subscription status updated from invoice");
    Ok(())
}

async fn payment_outcome(pool: &SqlitePool, intent: &PaymentIntent) -> Result<()> {
    let Some(client_id) = resolve_client(pool, intent.customer.as_deref(), &intent.metadata)
        .await?
    else {
        warn!(payment_intent_id = %intent.id, "payment event for unresolvable tenant");
        return Ok(());
    };

    let payment = Payment {
        stripe_payment_intent_id: intent.id.clone(),
        client_id: client_id.clone(),
        status: intent.status.clone(),
        amount: intent.amount,
        currency: intent.currency.clone(),
    };
    database::billing::upsert_payment(pool, &payment).await?;

    info!(payment_intent_id = %intent.id, client_id = %client_id, status = %intent.status, "payment upserted");
    Ok(())
}
