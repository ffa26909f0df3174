//! Integration tests driving the full router over an in-memory database
//! with mock providers.
//!
//! Run with:
//!   cargo test --test integration_tests

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use common::*;
use database::models::{Contact, SmsMessage, TelephonySettings};

const TENANT_A: &str = "tenant-a";
const TENANT_B: &str = "tenant-b";
const TENANT_A_NUMBER: &str = "+15550100001";
const CALLER: &str = "+15550009999";

async fn seed_tenant_a(app: &TestApp) {
    seed_client(&app.db, TENANT_A).await;
    database::telephony::upsert_settings(
        app.db.pool(),
        &TelephonySettings {
            client_id: TENANT_A.to_string(),
            phone_number: TENANT_A_NUMBER.to_string(),
            fallback_number: None,
        },
    )
    .await
    .unwrap();
}

async fn seed_contact(app: &TestApp, client_id: &str, id: &str, phone: &str) {
    database::contact::create_contact(
        app.db.pool(),
        &Contact {
            id: id.to_string(),
            client_id: client_id.to_string(),
            name: format!("Contact {id}"),
            phone_number: Some(phone.to_string()),
        },
    )
    .await
    .unwrap();
}

// ============================================================================
// Inbound SMS webhook: idempotency and signature enforcement
// ============================================================================

#[tokio::test]
async fn duplicate_inbound_sms_deliveries_persist_one_message() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let params = [
        ("MessageSid", "SM123"),
        ("From", CALLER),
        ("To", TENANT_A_NUMBER),
        ("Body", "Hello, I need funding"),
    ];

    for _ in 0..2 {
        let response = app.post_webhook("/webhooks/sms/inbound", &params, true).await;
        assert_status(response, StatusCode::OK).await;
    }

    let count = database::sms::message_count_for_client(app.db.pool(), TENANT_A)
        .await
        .unwrap();
    assert_eq!(count, 1, "redelivery must not duplicate the message");

    let message = database::sms::get_message_by_sid(app.db.pool(), "SM123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.direction, "inbound");
    assert_eq!(message.body, "Hello, I need funding");

    // One thread for the sender and one audit entry, not two of each.
    let threads = database::sms::threads_for_client(app.db.pool(), TENANT_A)
        .await
        .unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].counterparty_number, CALLER);
    let audit = database::audit::count_for_client(app.db.pool(), TENANT_A)
        .await
        .unwrap();
    assert_eq!(audit, 1);
}

#[tokio::test]
async fn missing_signature_is_rejected_before_any_write() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let params = [
        ("MessageSid", "SM123"),
        ("From", CALLER),
        ("To", TENANT_A_NUMBER),
        ("Body", "spoofed"),
    ];

    let response = app.post_webhook("/webhooks/sms/inbound", &params, false).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Nothing touched the ledger or the message table.
    let ledger = database::ledger::count_for_source(app.db.pool(), "twilio")
        .await
        .unwrap();
    assert_eq!(ledger, 0);
    let messages = database::sms::message_count_for_client(app.db.pool(), TENANT_A)
        .await
        .unwrap();
    assert_eq!(messages, 0);
}

#[tokio::test]
async fn wrong_signature_is_rejected() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let params = [("MessageSid", "SM123"), ("From", CALLER), ("To", TENANT_A_NUMBER)];
    let body = serde_urlencoded::to_string(params).unwrap();

    // A signature computed over a different URL never validates here.
    let owned: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let forged = telephony::signature::compute(
        TWILIO_TOKEN,
        "https://attacker.example/webhooks/sms/inbound",
        &owned,
    );

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/sms/inbound")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("X-Twilio-Signature", forged)
        .body(Body::from(body))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let ledger = database::ledger::count_for_source(app.db.pool(), "twilio")
        .await
        .unwrap();
    assert_eq!(ledger, 0);
}

#[tokio::test]
async fn inbound_sms_for_unconfigured_number_acknowledges_without_writes() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let params = [
        ("MessageSid", "SM404"),
        ("From", CALLER),
        ("To", "+15559999999"),
        ("Body", "wrong number"),
    ];

    let response = app.post_webhook("/webhooks/sms/inbound", &params, true).await;
    assert_status(response, StatusCode::OK).await;

    // The delivery is durably recorded, but no tenant rows were written.
    let ledger = database::ledger::count_for_source(app.db.pool(), "twilio")
        .await
        .unwrap();
    assert_eq!(ledger, 1);
    let messages = database::sms::message_count_for_client(app.db.pool(), TENANT_A)
        .await
        .unwrap();
    assert_eq!(messages, 0);
}

// ============================================================================
// SMS status webhook: per-transition idempotency
// ============================================================================

async fn seed_outbound_message(app: &TestApp, sid: &str) {
    let thread_id = database::sms::upsert_thread(app.db.pool(), TENANT_A, CALLER)
        .await
        .unwrap();
    database::sms::insert_message(
        app.db.pool(),
        &SmsMessage {
            id: format!("msg-{sid}"),
            thread_id,
            provider_sid: sid.to_string(),
            direction: "outbound".to_string(),
            body: "update".to_string(),
            status: "queued".to_string(),
            error_code: None,
            sent_by: Some("staff-1".to_string()),
            created_at: "2026-02-01 10:00:00".to_string(),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn each_status_transition_applies_once() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    seed_outbound_message(&app, "SM555").await;

    let post_status = |status: &'static str| {
        let app = &app;
        async move {
            let params = [("MessageSid", "SM555"), ("MessageStatus", status)];
            let response = app.post_webhook("/webhooks/sms/status", &params, true).await;
            assert_status(response, StatusCode::OK).await;
        }
    };

    post_status("sent").await;
    post_status("delivered").await;
    // Redelivery of the same transition is dropped by the ledger.
    post_status("delivered").await;

    let message = database::sms::get_message_by_sid(app.db.pool(), "SM555")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.status, "delivered");

    // Two distinct transitions, two ledger rows; the redelivery added none.
    let ledger = database::ledger::count_for_source(app.db.pool(), "twilio")
        .await
        .unwrap();
    assert_eq!(ledger, 2);
}

#[tokio::test]
async fn status_for_unknown_message_is_acknowledged() {
    let app = test_app().await;

    let params = [("MessageSid", "SMghost"), ("MessageStatus", "failed"), ("ErrorCode", "30003")];
    let response = app.post_webhook("/webhooks/sms/status", &params, true).await;
    assert_status(response, StatusCode::OK).await;
}

// ============================================================================
// Outbound SMS: role, membership, and consent vetoes
// ============================================================================

#[tokio::test]
async fn staff_grant_is_tenant_scoped_for_sends() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    seed_client(&app.db, TENANT_B).await;
    database::client::grant_client_staff(app.db.pool(), "staff-1", TENANT_A)
        .await
        .unwrap();
    seed_contact(&app, TENANT_A, "ct-a", "+15550031111").await;
    seed_contact(&app, TENANT_B, "ct-b", "+15550032222").await;

    let send_a = app
        .post_api(
            "/api/messages/send",
            Some("tok-staff"),
            json!({ "client_id": TENANT_A, "contact_id": "ct-a", "body": "hi" }),
        )
        .await;
    assert_status(send_a, StatusCode::OK).await;
    assert_eq!(app.sms.call_count(), 1);

    let send_b = app
        .post_api(
            "/api/messages/send",
            Some("tok-staff"),
            json!({ "client_id": TENANT_B, "contact_id": "ct-b", "body": "hi" }),
        )
        .await;
    assert_eq!(send_b.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.sms.call_count(), 1, "denied send must not reach the provider");
}

#[tokio::test]
async fn client_role_cannot_use_send_endpoint() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    database::client::grant_client_user(app.db.pool(), "client-login-1", TENANT_A)
        .await
        .unwrap();
    seed_contact(&app, TENANT_A, "ct-a", "+15550031111").await;

    let response = app
        .post_api(
            "/api/messages/send",
            Some("tok-client"),
            json!({ "client_id": TENANT_A, "contact_id": "ct-a", "body": "hi" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.sms.call_count(), 0);
}

#[tokio::test]
async fn dnc_entry_vetoes_outbound_sms() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    seed_contact(&app, TENANT_A, "ct-a", "+15550031111").await;
    database::consent::add_dnc(app.db.pool(), TENANT_A, "ct-a")
        .await
        .unwrap();

    let response = app
        .post_api(
            "/api/messages/send",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "contact_id": "ct-a", "body": "promo" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.sms.call_count(), 0, "vetoed send must not reach the provider");
}

#[tokio::test]
async fn opted_out_consent_vetoes_outbound_sms() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    seed_contact(&app, TENANT_A, "ct-a", "+15550031111").await;
    // The latest row governs.
    database::consent::record_consent(app.db.pool(), TENANT_A, "ct-a", "sms", "opted_in")
        .await
        .unwrap();
    database::consent::record_consent(app.db.pool(), TENANT_A, "ct-a", "sms", "opted_out")
        .await
        .unwrap();

    let response = app
        .post_api(
            "/api/messages/send",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "contact_id": "ct-a", "body": "promo" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.sms.call_count(), 0);
}

#[tokio::test]
async fn outbound_send_records_correlatable_message() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    seed_contact(&app, TENANT_A, "ct-a", "+15550031111").await;

    let response = app
        .post_api(
            "/api/messages/send",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "contact_id": "ct-a", "body": "your docs are ready" }),
        )
        .await;
    let body = body_json(response).await;
    let sid = body["provider_sid"].as_str().unwrap().to_string();

    let message = database::sms::get_message_by_sid(app.db.pool(), &sid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.direction, "outbound");
    assert_eq!(message.sent_by.as_deref(), Some("admin-1"));
    let audit = database::audit::count_for_client(app.db.pool(), TENANT_A)
        .await
        .unwrap();
    assert_eq!(audit, 1);

    // The later status webhook correlates through that sid.
    let params = [("MessageSid", sid.as_str()), ("MessageStatus", "delivered")];
    let status = app.post_webhook("/webhooks/sms/status", &params, true).await;
    assert_status(status, StatusCode::OK).await;

    let updated = database::sms::get_message_by_sid(app.db.pool(), &sid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "delivered");
}

// ============================================================================
// Payment webhooks
// ============================================================================

#[tokio::test]
async fn stripe_webhook_without_signature_is_rejected() {
    let app = test_app().await;

    let payload = r#"{"id":"evt_1","type":"invoice.paid","data":{"object":{"id":"in_1"}}}"#;
    let response = app.post_stripe(payload, false).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let ledger = database::ledger::count_for_source(app.db.pool(), "stripe")
        .await
        .unwrap();
    assert_eq!(ledger, 0);
}

#[tokio::test]
async fn duplicate_event_id_is_dropped() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let payload = json!({
        "id": "evt_pi_1",
        "type": "payment_intent.succeeded",
        "data": {"object": {
            "id": "pi_1",
            "customer": null,
            "status": "succeeded",
            "amount": 250000,
            "currency": "usd",
            "metadata": {"client_id": TENANT_A}
        }}
    })
    .to_string();

    for _ in 0..2 {
        let response = app.post_stripe(&payload, true).await;
        assert_status(response, StatusCode::OK).await;
    }

    let ledger = database::ledger::count_for_source(app.db.pool(), "stripe")
        .await
        .unwrap();
    assert_eq!(ledger, 1);

    let payment = database::billing::get_payment(app.db.pool(), "pi_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.client_id, TENANT_A);
    assert_eq!(payment.status, "succeeded");
    assert_eq!(payment.amount, Some(250000));
}

#[tokio::test]
async fn checkout_then_subscription_converge_on_one_row() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    // Checkout stamps the tenant into metadata and records the customer
    // mapping; the subscription row arrives with the lifecycle event.
    let checkout = json!({
        "id": "evt_cs_1",
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_1",
            "customer": "cus_9",
            "mode": "subscription",
            "subscription": "sub_1",
            "payment_intent": null,
            "metadata": {"client_id": TENANT_A}
        }}
    })
    .to_string();
    let response = app.post_stripe(&checkout, true).await;
    assert_status(response, StatusCode::OK).await;

    let mapped = database::billing::client_for_customer(app.db.pool(), "cus_9")
        .await
        .unwrap();
    assert_eq!(mapped.as_deref(), Some(TENANT_A));

    // The lifecycle event carries no metadata; the stored mapping resolves it.
    let lifecycle = |event_id: &str, status: &str| {
        json!({
            "id": event_id,
            "type": "customer.subscription.updated",
            "data": {"object": {
                "id": "sub_1",
                "customer": "cus_9",
                "status": status,
                "items": {"data": [{"price": {"id": "price_pro"}}]},
                "current_period_end": 1790000000i64,
                "cancel_at_period_end": false
            }}
        })
        .to_string()
    };

    let response = app.post_stripe(&lifecycle("evt_sub_1", "trialing"), true).await;
    assert_status(response, StatusCode::OK).await;
    let response = app.post_stripe(&lifecycle("evt_sub_2", "active"), true).await;
    assert_status(response, StatusCode::OK).await;

    let rows = database::billing::subscription_row_count(app.db.pool(), "sub_1")
        .await
        .unwrap();
    assert_eq!(rows, 1, "repeated lifecycle events must converge to one row");

    let sub = database::billing::get_subscription(app.db.pool(), "sub_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.client_id, TENANT_A);
    assert_eq!(sub.status, "active");
    assert_eq!(sub.price_id.as_deref(), Some("price_pro"));
}

#[tokio::test]
async fn failed_invoice_narrows_subscription_status() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    database::billing::upsert_customer(app.db.pool(), TENANT_A, "cus_9")
        .await
        .unwrap();
    database::billing::upsert_subscription(
        app.db.pool(),
        &database::Subscription {
            stripe_subscription_id: "sub_1".to_string(),
            client_id: TENANT_A.to_string(),
            status: "active".to_string(),
            price_id: Some("price_pro".to_string()),
            current_period_end: None,
            cancel_at_period_end: false,
        },
    )
    .await
    .unwrap();

    let payload = json!({
        "id": "evt_inv_1",
        "type": "invoice.payment_failed",
        "data": {"object": {
            "id": "in_1",
            "customer": "cus_9",
            "subscription": "sub_1",
            "status": "open"
        }}
    })
    .to_string();
    let response = app.post_stripe(&payload, true).await;
    assert_status(response, StatusCode::OK).await;

    let sub = database::billing::get_subscription(app.db.pool(), "sub_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.status, "past_due");
}

#[tokio::test]
async fn unresolvable_tenant_is_acknowledged_not_retried() {
    let app = test_app().await;

    // No customer mapping, no metadata: logged and acknowledged.
    let payload = json!({
        "id": "evt_orphan",
        "type": "customer.subscription.updated",
        "data": {"object": {
            "id": "sub_x",
            "customer": "cus_unknown",
            "status": "active"
        }}
    })
    .to_string();

    let response = app.post_stripe(&payload, true).await;
    assert_status(response, StatusCode::OK).await;

    let rows = database::billing::subscription_row_count(app.db.pool(), "sub_x")
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged() {
    let app = test_app().await;

    let payload = r#"{"id":"evt_ref","type":"charge.refunded","data":{"object":{}}}"#;
    let response = app.post_stripe(payload, true).await;
    assert_status(response, StatusCode::OK).await;
}

// ============================================================================
// Voice routing
// ============================================================================

#[tokio::test]
async fn inbound_call_falls_back_to_hangup_message() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let params = [
        ("CallSid", "CA1"),
        ("From", CALLER),
        ("To", TENANT_A_NUMBER),
        ("CallStatus", "ringing"),
    ];
    let response = app.post_webhook("/webhooks/voice/inbound", &params, true).await;
    let body = assert_status(response, StatusCode::OK).await;

    assert!(body.contains("<Say>"), "caller hears a message: {body}");
    assert!(body.contains("<Hangup/>"));

    let call = database::telephony::get_call(app.db.pool(), "CA1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(call.direction, "inbound");
    assert_eq!(call.answered_by, None);
    let events = database::telephony::call_event_count(app.db.pool(), "CA1")
        .await
        .unwrap();
    assert_eq!(events, 1);
}

#[tokio::test]
async fn inbound_call_dials_fallback_number_when_configured() {
    let app = test_app().await;
    seed_client(&app.db, TENANT_A).await;
    database::telephony::upsert_settings(
        app.db.pool(),
        &TelephonySettings {
            client_id: TENANT_A.to_string(),
            phone_number: TENANT_A_NUMBER.to_string(),
            fallback_number: Some("+15550777777".to_string()),
        },
    )
    .await
    .unwrap();

    let params = [("CallSid", "CA2"), ("From", CALLER), ("To", TENANT_A_NUMBER)];
    let response = app.post_webhook("/webhooks/voice/inbound", &params, true).await;
    let body = assert_status(response, StatusCode::OK).await;

    assert!(
        body.contains("<Number>+15550777777</Number>"),
        "fallback number dialed: {body}"
    );
}

#[tokio::test]
async fn inbound_call_prefers_most_recently_seen_identity() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    let pool = app.db.pool();

    database::profile::upsert_profile(
        pool,
        &database::Profile {
            id: "agent-2".to_string(),
            email: "agent2@ops.test".to_string(),
            display_name: None,
            role: "user".to_string(),
        },
    )
    .await
    .unwrap();
    database::client::grant_client_staff(pool, "staff-1", TENANT_A)
        .await
        .unwrap();
    database::client::grant_client_staff(pool, "agent-2", TENANT_A)
        .await
        .unwrap();

    // Explicit timestamps: agent-2 registered later.
    for (profile, identity, seen) in [
        ("staff-1", "agent_staff1", "2026-02-01 09:00:00"),
        ("agent-2", "agent_two", "2026-02-01 09:05:00"),
    ] {
        sqlx::query(
            "INSERT INTO telephony_identities (profile_id, client_identity, last_seen_at) \
             VALUES (?, ?, ?)",
        )
        .bind(profile)
        .bind(identity)
        .bind(seen)
        .execute(pool)
        .await
        .unwrap();
    }

    let params = [("CallSid", "CA3"), ("From", CALLER), ("To", TENANT_A_NUMBER)];
    let response = app.post_webhook("/webhooks/voice/inbound", &params, true).await;
    let body = assert_status(response, StatusCode::OK).await;

    assert!(
        body.contains("<Client>agent_two</Client>"),
        "most recent identity wins: {body}"
    );

    let call = database::telephony::get_call(pool, "CA3").await.unwrap().unwrap();
    assert_eq!(call.answered_by.as_deref(), Some("agent-2"));
}

#[tokio::test]
async fn inbound_call_for_unconfigured_number_gets_generic_response() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let params = [("CallSid", "CA4"), ("From", CALLER), ("To", "+15559999999")];
    let response = app.post_webhook("/webhooks/voice/inbound", &params, true).await;
    let body = assert_status(response, StatusCode::OK).await;

    // A generic spoken message, nothing about configuration.
    assert!(body.contains("<Say>"));
    assert!(body.contains("<Hangup/>"));
    assert!(!body.to_lowercase().contains("tenant"));

    assert!(database::telephony::get_call(app.db.pool(), "CA4")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn repeated_call_webhooks_converge_on_one_call_row() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    for status in ["ringing", "in-progress", "completed"] {
        let params = [
            ("CallSid", "CA5"),
            ("From", CALLER),
            ("To", TENANT_A_NUMBER),
            ("CallStatus", status),
        ];
        let response = app.post_webhook("/webhooks/voice/inbound", &params, true).await;
        assert_status(response, StatusCode::OK).await;
    }

    let call = database::telephony::get_call(app.db.pool(), "CA5")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(call.status, "completed");

    // The audit trail keeps every delivery.
    let events = database::telephony::call_event_count(app.db.pool(), "CA5")
        .await
        .unwrap();
    assert_eq!(events, 3);
}

#[tokio::test]
async fn outbound_dial_uses_tenant_number_as_caller_id() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    database::telephony::touch_identity(app.db.pool(), "staff-1", "agent_staff1")
        .await
        .unwrap();

    let params = [
        ("CallSid", "CA6"),
        ("From", "client:agent_staff1"),
        ("To", "+15550123456"),
        ("ClientId", TENANT_A),
    ];
    let response = app.post_webhook("/webhooks/voice/outbound", &params, true).await;
    let body = assert_status(response, StatusCode::OK).await;

    assert!(body.contains(&format!("<Dial callerId=\"{TENANT_A_NUMBER}\">")));
    assert!(body.contains("<Number>+15550123456</Number>"));

    let call = database::telephony::get_call(app.db.pool(), "CA6")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(call.direction, "outbound");
    assert_eq!(call.answered_by.as_deref(), Some("staff-1"));
}

#[tokio::test]
async fn unsigned_voice_webhook_is_rejected() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let params = [("CallSid", "CA7"), ("From", CALLER), ("To", TENANT_A_NUMBER)];
    let response = app.post_webhook("/webhooks/voice/inbound", &params, false).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(database::telephony::get_call(app.db.pool(), "CA7")
        .await
        .unwrap()
        .is_none());
}

// ============================================================================
// Entitlement
// ============================================================================

async fn access_for(app: &TestApp, token: &str) -> bool {
    let response = app
        .get_api(&format!("/api/billing/access?client_id={TENANT_A}"), Some(token))
        .await;
    let body = body_json(response).await;
    body["has_access"].as_bool().unwrap()
}

#[tokio::test]
async fn entitlement_follows_billing_state() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    let pool = app.db.pool();
    database::client::grant_client_user(pool, "client-login-1", TENANT_A)
        .await
        .unwrap();

    assert!(!access_for(&app, "tok-client").await, "no billing rows yet");

    database::billing::upsert_subscription(
        pool,
        &database::Subscription {
            stripe_subscription_id: "sub_1".to_string(),
            client_id: TENANT_A.to_string(),
            status: "active".to_string(),
            price_id: None,
            current_period_end: None,
            cancel_at_period_end: false,
        },
    )
    .await
    .unwrap();
    assert!(access_for(&app, "tok-client").await, "active subscription grants access");

    database::billing::upsert_subscription(
        pool,
        &database::Subscription {
            stripe_subscription_id: "sub_1".to_string(),
            client_id: TENANT_A.to_string(),
            status: "canceled".to_string(),
            price_id: None,
            current_period_end: None,
            cancel_at_period_end: false,
        },
    )
    .await
    .unwrap();
    assert!(!access_for(&app, "tok-client").await, "canceled subscription alone does not");

    database::billing::upsert_payment(
        pool,
        &database::Payment {
            stripe_payment_intent_id: "pi_1".to_string(),
            client_id: TENANT_A.to_string(),
            status: "succeeded".to_string(),
            amount: Some(250000),
            currency: Some("usd".to_string()),
        },
    )
    .await
    .unwrap();
    assert!(
        access_for(&app, "tok-client").await,
        "succeeded one-time payment grants access"
    );

    database::billing::upsert_payment(
        pool,
        &database::Payment {
            stripe_payment_intent_id: "pi_1".to_string(),
            client_id: TENANT_A.to_string(),
            status: "failed".to_string(),
            amount: Some(250000),
            currency: Some("usd".to_string()),
        },
    )
    .await
    .unwrap();
    assert!(!access_for(&app, "tok-client").await, "failed payment does not");
}

#[tokio::test]
async fn staff_membership_overrides_billing() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    database::client::grant_client_staff(app.db.pool(), "staff-1", TENANT_A)
        .await
        .unwrap();

    // No billing rows at all.
    assert!(access_for(&app, "tok-staff").await);
}

// ============================================================================
// Document analysis
// ============================================================================

const DOC_PATH: &str = "tenants/tenant-a/docs/statement.pdf";

#[tokio::test]
async fn analyze_appends_extraction_and_latest_returns_it() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let response = app
        .post_api(
            "/api/documents/analyze",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "storage_path": DOC_PATH, "mime_type": "application/pdf" }),
        )
        .await;
    let body = body_json(response).await;
    let extraction_id = body["extraction_id"].as_str().unwrap().to_string();
    assert_eq!(body["result"]["document_type"], "bank_statement");

    let response = app
        .get_api(
            &format!(
                "/api/documents/latest?client_id={TENANT_A}&storage_path={}",
                urlencode(DOC_PATH)
            ),
            Some("tok-admin"),
        )
        .await;
    let latest = body_json(response).await;
    assert_eq!(latest["id"].as_str().unwrap(), extraction_id);

    // A second run appends; latest moves, history keeps both.
    let response = app
        .post_api(
            "/api/documents/analyze",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "storage_path": DOC_PATH, "mime_type": "application/pdf" }),
        )
        .await;
    assert_status(response, StatusCode::OK).await;

    let history = database::document::history_for_path(app.db.pool(), TENANT_A, DOC_PATH)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn analyze_missing_blob_is_not_found() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let response = app
        .post_api(
            "/api/documents/analyze",
            Some("tok-admin"),
            json!({
                "client_id": TENANT_A,
                "storage_path": "tenants/tenant-a/docs/absent.pdf",
                "mime_type": "application/pdf"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analyze_requires_tenant_membership() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    // client-login-1 has no grant for tenant-a.
    let response = app
        .post_api(
            "/api/documents/analyze",
            Some("tok-client"),
            json!({ "client_id": TENANT_A, "storage_path": DOC_PATH, "mime_type": "application/pdf" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signed_url_is_issued_for_stored_blob() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let response = app
        .post_api(
            "/api/documents/sign",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "storage_path": DOC_PATH }),
        )
        .await;
    let body = body_json(response).await;
    let url = body["url"].as_str().unwrap();
    assert!(url.contains(DOC_PATH));
    assert!(url.contains("exp=3600"));
}

// ============================================================================
// Tenant administration and tokens
// ============================================================================

#[tokio::test]
async fn invite_creates_tenant_and_grants_existing_profile() {
    let app = test_app().await;

    let response = app
        .post_api(
            "/api/clients/invite",
            Some("tok-admin"),
            json!({ "client_name": "Acme Funding", "email": "owner@tenant-a.test" }),
        )
        .await;
    let body = body_json(response).await;
    let client_id = body["client_id"].as_str().unwrap();

    // The invitee's existing profile got a client-user grant.
    assert!(
        database::client::is_client_user(app.db.pool(), "client-login-1", client_id)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn invite_requires_internal_role() {
    let app = test_app().await;

    let response = app
        .post_api(
            "/api/clients/invite",
            Some("tok-client"),
            json!({ "client_name": "Rogue Tenant" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn softphone_token_registers_identity() {
    let app = test_app().await;
    seed_tenant_a(&app).await;
    database::client::grant_client_staff(app.db.pool(), "staff-1", TENANT_A)
        .await
        .unwrap();

    let response = app
        .post_api(
            "/api/telephony/token",
            Some("tok-staff"),
            json!({ "client_id": TENANT_A, "identity": "agent_staff1" }),
        )
        .await;
    let body = body_json(response).await;
    assert!(!body["token"].as_str().unwrap().is_empty());

    let profile = database::telephony::profile_for_identity(app.db.pool(), "agent_staff1")
        .await
        .unwrap();
    assert_eq!(profile.as_deref(), Some("staff-1"));
}

#[tokio::test]
async fn missing_bearer_token_is_unauthenticated() {
    let app = test_app().await;

    let response = app
        .post_api("/api/clients/invite", None, json!({ "client_name": "X" }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_rejects_prices_outside_allow_list() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let response = app
        .post_api(
            "/api/billing/checkout",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "price_id": "price_evil" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_rejects_unknown_mode() {
    let app = test_app().await;
    seed_tenant_a(&app).await;

    let response = app
        .post_api(
            "/api/billing/checkout",
            Some("tok-admin"),
            json!({ "client_id": TENANT_A, "price_id": "price_basic", "mode": "setup" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn urlencode(s: &str) -> String {
    s.replace('/', "%2F")
}
