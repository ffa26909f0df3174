//! Telephony provider REST client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, TelephonyError};

/// The sending identity for an outbound message: a shared messaging-service
/// id when configured, otherwise the tenant's provisioned number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFrom {
    MessagingService(String),
    Number(String),
}

/// Provider acknowledgement for a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Provider message sid; stored for later status-webhook correlation.
    pub sid: String,
    /// Initial provider status (`queued`, `accepted`, ...).
    pub status: String,
}

/// Sends SMS through the telephony provider.
///
/// Object-safe so handlers hold `Arc<dyn SmsSender>` and tests can count
/// calls without touching the network.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, from: &SendFrom, to: &str, body: &str) -> Result<SentMessage>;
}

/// Message resource returned by the provider REST API.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    status: String,
}

/// REST client for the telephony provider.
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.twilio.com";

    /// Build a client with the provider account credential.
    pub fn new(base_url: &str, account_sid: &str, auth_token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        })
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    async fn send_sms(&self, from: &SendFrom, to: &str, body: &str) -> Result<SentMessage> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let mut form: Vec<(&str, &str)> = vec![("To", to), ("Body", body)];
        match from {
            SendFrom::MessagingService(sid) => form.push(("MessagingServiceSid", sid)),
            SendFrom::Number(number) => form.push(("From", number)),
        }

        debug!(to, "sending SMS");
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let resource: MessageResource = response.json().await?;
        info!(sid = %resource.sid, status = %resource.status, "SMS accepted by provider");

        Ok(SentMessage {
            sid: resource.sid,
            status: resource.status,
        })
    }
}
