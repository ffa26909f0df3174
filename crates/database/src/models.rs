//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tenant: a client business whose contacts, numbers, billing state and
/// documents are isolated from every other tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Client {
    /// Opaque tenant id.
    pub id: String,
    /// Business display name.
    pub name: String,
    /// Profile id of the staff member who created the tenant.
    pub created_by: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Profile row for an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    /// Auth-provider principal id.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Raw role string; parse with `access::Role`.
    pub role: String,
}

/// Billing customer mapping: one external payment-provider customer per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BillingCustomer {
    pub client_id: String,
    pub stripe_customer_id: String,
}

/// Subscription state, upserted on every lifecycle webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    /// Provider subscription id (natural key).
    pub stripe_subscription_id: String,
    pub client_id: String,
    /// Provider status string; `active`/`trialing` grant access.
    pub status: String,
    pub price_id: Option<String>,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
}

/// One-time payment state, upserted on payment-intent outcome events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    /// Provider payment-intent id (natural key).
    pub stripe_payment_intent_id: String,
    pub client_id: String,
    /// Provider status string; `succeeded`/`paid` grant access.
    pub status: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// Per-tenant telephony provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TelephonySettings {
    pub client_id: String,
    /// Provisioned number; inbound tenant resolution keys on this.
    pub phone_number: String,
    /// Human fallback number dialed when no softphone identity is active.
    pub fallback_number: Option<String>,
}

/// Softphone identity registration for a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TelephonyIdentity {
    pub profile_id: String,
    /// Provider client-identity string dialed via `<Client>`.
    pub client_identity: String,
    /// Most-recently-seen identity wins when routing an inbound call.
    pub last_seen_at: String,
}

/// Call record, upserted by provider call sid as status changes arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Call {
    pub call_sid: String,
    pub client_id: String,
    /// `inbound` or `outbound`.
    pub direction: String,
    pub from_number: String,
    pub to_number: String,
    pub status: String,
    /// Profile id of the agent the call was routed to, if resolved.
    pub answered_by: Option<String>,
}

/// A minimal contact record used for inbound-SMS correlation and consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub phone_number: Option<String>,
}

/// SMS conversation thread, unique per (tenant, counterparty number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SmsThread {
    pub id: String,
    pub client_id: String,
    pub counterparty_number: String,
}

/// A single SMS message within a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SmsMessage {
    pub id: String,
    pub thread_id: String,
    /// Provider message sid; status webhooks correlate back through this.
    pub provider_sid: String,
    /// `inbound` or `outbound`.
    pub direction: String,
    pub body: String,
    pub status: String,
    pub error_code: Option<String>,
    /// Profile id of the sender for outbound messages.
    pub sent_by: Option<String>,
    pub created_at: String,
}

/// Consent record for a contact/channel pair; the most recent row governs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConsentRecord {
    pub id: i64,
    pub client_id: String,
    pub contact_id: String,
    pub channel: String,
    /// `opted_in` or `opted_out`.
    pub status: String,
    pub created_at: String,
}

/// Structured extraction result for a stored document. Append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DocumentExtraction {
    pub id: String,
    pub client_id: String,
    pub storage_path: String,
    /// JSON result from the content-generation service.
    pub result: String,
    pub created_by: String,
    pub created_at: String,
}
