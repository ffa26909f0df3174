//! Payment provider REST client.
//!
//! Constructed once at process startup and shared through application
//! state; there is no lazily-initialized global.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{PaymentsError, Result};

/// A created checkout or portal session.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub id: String,
    /// Redirect URL for the caller's browser.
    pub url: String,
}

/// A provider customer.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

/// Checkout mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Subscription,
    Payment,
}

impl CheckoutMode {
    fn as_str(self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }
}

/// REST client for the payment provider.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.stripe.com";

    pub fn new(base_url: &str, secret_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Create a provider customer stamped with the owning tenant.
    pub async fn create_customer(&self, client_id: &str, email: Option<&str>) -> Result<Customer> {
        let mut form = vec![("metadata[client_id]".to_string(), client_id.to_string())];
        if let Some(email) = email {
            form.push(("email".to_string(), email.to_string()));
        }

        let customer: Customer = self.post_form("/v1/customers", &form).await?;
        info!(client_id, customer_id = %customer.id, "created billing customer");
        Ok(customer)
    }

    /// Create a checkout session. The tenant id is stamped into the session
    /// metadata so webhook-side tenant resolution has a fallback when the
    /// customer mapping has not been persisted yet.
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        client_id: &str,
        price_id: &str,
        mode: CheckoutMode,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<Session> {
        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("mode".to_string(), mode.as_str().to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
            ("metadata[client_id]".to_string(), client_id.to_string()),
        ];

        self.post_form("/v1/checkout/sessions", &form).await
    }

    /// Create a billing portal session.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<Session> {
        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];

        self.post_form("/v1/billing_portal/sessions", &form).await
    }
}
