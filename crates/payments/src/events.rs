//! Typed payment webhook events.
//!
//! The raw envelope is parsed first (only after signature verification);
//! the inner object is then deserialized into the struct matching the
//! event type. Unknown event types are preserved as [`EventKind::Other`]
//! so the handler can acknowledge them without branching.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{PaymentsError, Result};

/// The webhook envelope.
#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// Metadata map stamped onto provider objects at creation time.
#[derive(Debug, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub client_id: Option<String>,
}

/// A completed checkout session.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub customer: Option<String>,
    /// `subscription` or `payment`.
    pub mode: String,
    pub subscription: Option<String>,
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct PriceRef {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<PriceRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// A subscription lifecycle object.
#[derive(Debug, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub items: SubscriptionItems,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SubscriptionObject {
    /// The first line item's price id, when present.
    pub fn price_id(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
    }
}

/// An invoice outcome object.
#[derive(Debug, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub status: Option<String>,
}

/// A one-off payment-intent outcome object.
#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub customer: Option<String>,
    pub status: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// The event types this processor acts on.
#[derive(Debug)]
pub enum EventKind {
    CheckoutCompleted(CheckoutSession),
    SubscriptionChanged(SubscriptionObject),
    SubscriptionDeleted(SubscriptionObject),
    InvoicePaid(Invoice),
    InvoicePaymentFailed(Invoice),
    PaymentIntentOutcome(PaymentIntent),
    /// Anything else: acknowledged, never processed.
    Other,
}

impl Event {
    /// Parse a verified raw body into the envelope.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| PaymentsError::InvalidEvent(e.to_string()))
    }

    /// Deserialize the inner object according to the event type.
    pub fn kind(&self) -> Result<EventKind> {
        let object = self.data.object.clone();
        let invalid = |e: serde_json::Error| PaymentsError::InvalidEvent(e.to_string());

        let kind = match self.event_type.as_str() {
            "checkout.session.completed" => {
                EventKind::CheckoutCompleted(serde_json::from_value(object).map_err(invalid)?)
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                EventKind::SubscriptionChanged(serde_json::from_value(object).map_err(invalid)?)
            }
            "customer.subscription.deleted" => {
                EventKind::SubscriptionDeleted(serde_json::from_value(object).map_err(invalid)?)
            }
            "invoice.paid" => EventKind::InvoicePaid(serde_json::from_value(object).map_err(invalid)?),
            "invoice.payment_failed" => {
                EventKind::InvoicePaymentFailed(serde_json::from_value(object).map_err(invalid)?)
            }
            "payment_intent.succeeded" | "payment_intent.payment_failed" => {
                EventKind::PaymentIntentOutcome(serde_json::from_value(object).map_err(invalid)?)
            }
            _ => EventKind::Other,
        };

        Ok(kind)
    }
}
