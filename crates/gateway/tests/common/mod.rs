//! Shared test harness: in-memory database, mock providers, signed
//! webhook requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use access::{AccessError, Principal, TokenVerifier};
use database::Database;
use doc_analysis::{AnalysisError, Analyzer, BlobStore};
use gateway::{AppState, Config};
use payments::StripeClient;
use telephony::{SendFrom, SentMessage, SmsSender, TokenSigner};

pub const TWILIO_TOKEN: &str = "twilio_test_token";
pub const STRIPE_SECRET: &str = "whsec_test_secret";
pub const BASE_URL: &str = "https://app.test";

/// Token verifier backed by a static token → principal map.
pub struct MockVerifier {
    tokens: HashMap<String, Principal>,
}

impl MockVerifier {
    pub fn new(entries: &[(&str, &str, &str)]) -> Self {
        let tokens = entries
            .iter()
            .map(|(token, id, email)| {
                (
                    token.to_string(),
                    Principal {
                        id: id.to_string(),
                        email: email.to_string(),
                    },
                )
            })
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for MockVerifier {
    async fn verify(&self, token: &str) -> access::Result<Principal> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AccessError::Unauthenticated("token rejected".into()))
    }
}

/// SMS sender that records every call instead of hitting the network.
#[derive(Default)]
pub struct MockSms {
    pub sent: Mutex<Vec<(SendFrom, String, String)>>,
}

impl MockSms {
    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsSender for MockSms {
    async fn send_sms(
        &self,
        from: &SendFrom,
        to: &str,
        body: &str,
    ) -> telephony::Result<SentMessage> {
        let mut sent = self.sent.lock().unwrap();
        let sid = format!("SMmock{}", sent.len() + 1);
        sent.push((from.clone(), to.to_string(), body.to_string()));
        Ok(SentMessage {
            sid,
            status: "queued".to_string(),
        })
    }
}

/// Blob store backed by a map.
pub struct MockBlobs {
    pub blobs: HashMap<String, Vec<u8>>,
}

#[async_trait]
impl BlobStore for MockBlobs {
    async fn fetch(&self, path: &str) -> doc_analysis::Result<Vec<u8>> {
        self.blobs
            .get(path)
            .cloned()
            .ok_or_else(|| AnalysisError::BlobNotFound(path.to_string()))
    }

    async fn signed_url(&self, path: &str, expires_secs: u64) -> doc_analysis::Result<String> {
        if !self.blobs.contains_key(path) {
            return Err(AnalysisError::BlobNotFound(path.to_string()));
        }
        Ok(format!("{BASE_URL}/signed/{path}?exp={expires_secs}"))
    }
}

/// Analyzer returning a fixed extraction.
pub struct MockAnalyzer;

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, _bytes: &[u8], _mime_type: &str) -> doc_analysis::Result<Value> {
        Ok(serde_json::json!({ "document_type": "bank_statement", "total": 1200 }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub sms: Arc<MockSms>,
}

fn test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: "sqlite::memory:".to_string(),
        public_base_url: BASE_URL.to_string(),
        auth_url: "https://auth.test".to_string(),
        auth_anon_key: "anon".to_string(),
        twilio_account_sid: "ACtest".to_string(),
        twilio_auth_token: TWILIO_TOKEN.to_string(),
        twilio_api_key_sid: "SKtest".to_string(),
        twilio_api_key_secret: "sk_secret".to_string(),
        twilio_app_sid: "APtest".to_string(),
        messaging_service_sid: None,
        stripe_secret_key: "sk_test_x".to_string(),
        stripe_webhook_secret: STRIPE_SECRET.to_string(),
        allowed_price_ids: vec!["price_basic".to_string(), "price_pro".to_string()],
        storage_url: "https://storage.test".to_string(),
        storage_bucket: "documents".to_string(),
        storage_service_key: "service".to_string(),
        analysis_url: "https://analysis.test".to_string(),
        analysis_api_key: "key".to_string(),
    }
}

/// Build a router over an in-memory database with mock providers.
///
/// Known bearer tokens: `tok-admin` (admin-1), `tok-staff` (staff-1),
/// `tok-client` (client-login-1). Profiles are seeded to match.
pub async fn test_app() -> TestApp {
    // Single connection: pooled in-memory connections each see their own
    // empty database.
    let db = Database::connect_with_pool_size("sqlite::memory:", 1)
        .await
        .unwrap();
    db.migrate().await.unwrap();

    for (id, email, role) in [
        ("admin-1", "admin@ops.test", "admin"),
        ("staff-1", "staff@ops.test", "user"),
        ("client-login-1", "owner@tenant-a.test", "client"),
    ] {
        database::profile::upsert_profile(
            db.pool(),
            &database::Profile {
                id: id.to_string(),
                email: email.to_string(),
                display_name: None,
                role: role.to_string(),
            },
        )
        .await
        .unwrap();
    }

    let config = test_config();
    let verifier = MockVerifier::new(&[
        ("tok-admin", "admin-1", "admin@ops.test"),
        ("tok-staff", "staff-1", "staff@ops.test"),
        ("tok-client", "client-login-1", "owner@tenant-a.test"),
    ]);
    let sms = Arc::new(MockSms::default());
    let token_signer = TokenSigner {
        account_sid: config.twilio_account_sid.clone(),
        api_key_sid: config.twilio_api_key_sid.clone(),
        api_key_secret: config.twilio_api_key_secret.clone(),
        outgoing_application_sid: config.twilio_app_sid.clone(),
    };
    let stripe = StripeClient::new("https://stripe.invalid", &config.stripe_secret_key).unwrap();

    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        verifier: Arc::new(verifier),
        sms: sms.clone(),
        token_signer: Arc::new(token_signer),
        stripe: Arc::new(stripe),
        blobs: Arc::new(MockBlobs {
            blobs: HashMap::from([(
                "tenants/tenant-a/docs/statement.pdf".to_string(),
                b"%PDF-1.4 test".to_vec(),
            )]),
        }),
        analyzer: Arc::new(MockAnalyzer),
    };

    TestApp {
        router: gateway::routes::router().with_state(state),
        db,
        sms,
    }
}

pub async fn seed_client(db: &Database, id: &str) {
    sqlx::query("INSERT INTO clients (id, name, created_by) VALUES (?, ?, 'seed')")
        .bind(id)
        .bind(format!("Client {id}"))
        .execute(db.pool())
        .await
        .unwrap();
}

impl TestApp {
    /// POST a form-encoded telephony webhook, optionally signed.
    pub async fn post_webhook(
        &self,
        path: &str,
        params: &[(&str, &str)],
        signed: bool,
    ) -> Response<Body> {
        let body = serde_urlencoded::to_string(params).unwrap();
        let owned: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");

        if signed {
            let url = format!("{BASE_URL}{path}");
            let signature = telephony::signature::compute(TWILIO_TOKEN, &url, &owned);
            request = request.header("X-Twilio-Signature", signature);
        }

        self.router
            .clone()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    /// POST a raw payment webhook payload, optionally signed.
    pub async fn post_stripe(&self, payload: &str, signed: bool) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri("/webhooks/stripe")
            .header(header::CONTENT_TYPE, "application/json");

        if signed {
            let header_value = payments::signature::sign(
                STRIPE_SECRET,
                payload.as_bytes(),
                chrono::Utc::now().timestamp(),
            );
            request = request.header("Stripe-Signature", header_value);
        }

        self.router
            .clone()
            .oneshot(request.body(Body::from(payload.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// POST a JSON action request with a bearer token.
    pub async fn post_api(&self, path: &str, token: Option<&str>, body: Value) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// GET an action endpoint with a bearer token.
    pub async fn get_api(&self, path: &str, token: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

/// Collect a response body as a string.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Assert a status code with the body in the failure message.
pub async fn assert_status(response: Response<Body>, expected: StatusCode) -> String {
    let status = response.status();
    let body = body_string(response).await;
    assert_eq!(status, expected, "unexpected status, body: {body}");
    body
}
