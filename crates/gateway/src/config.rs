//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Public base URL of this deployment; webhook signature verification
    /// binds to the exact request URL, and checkout redirects build on it.
    pub public_base_url: String,

    /// Auth provider base URL.
    pub auth_url: String,
    /// Auth provider anonymous key.
    pub auth_anon_key: String,

    /// Telephony account sid.
    pub twilio_account_sid: String,
    /// Telephony auth token; also the webhook signing secret.
    pub twilio_auth_token: String,
    /// Telephony API key pair for softphone token minting.
    pub twilio_api_key_sid: String,
    pub twilio_api_key_secret: String,
    /// Outbound voice application sid.
    pub twilio_app_sid: String,
    /// Optional shared messaging-service id; takes precedence over the
    /// tenant's provisioned number when sending.
    pub messaging_service_sid: Option<String>,

    /// Payment provider secret key.
    pub stripe_secret_key: String,
    /// Payment webhook signing secret.
    pub stripe_webhook_secret: String,
    /// Purchasable price ids; checkout requests outside this list are 400s.
    pub allowed_price_ids: Vec<String>,

    /// Object-store base URL, bucket, and service credential.
    pub storage_url: String,
    pub storage_bucket: String,
    pub storage_service_key: String,

    /// Content-generation service endpoint and credential.
    pub analysis_url: String,
    pub analysis_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `GATEWAY_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:fundops.db?mode=rwc` |
    /// | `PUBLIC_BASE_URL` | Public deployment URL | (required) |
    /// | `AUTH_URL` | Auth provider base URL | (required) |
    /// | `AUTH_ANON_KEY` | Auth provider anon key | (required) |
    /// | `TWILIO_ACCOUNT_SID` | Telephony account sid | (required) |
    /// | `TWILIO_AUTH_TOKEN` | Telephony auth token / signing secret | (required) |
    /// | `TWILIO_API_KEY_SID` | API key sid for tokens | (required) |
    /// | `TWILIO_API_KEY_SECRET` | API key secret for tokens | (required) |
    /// | `TWILIO_APP_SID` | Outbound voice application sid | (required) |
    /// | `MESSAGING_SERVICE_SID` | Shared messaging-service id | (optional) |
    /// | `STRIPE_SECRET_KEY` | Payment provider secret key | (required) |
    /// | `STRIPE_WEBHOOK_SECRET` | Payment webhook signing secret | (required) |
    /// | `ALLOWED_PRICE_IDS` | Comma-separated purchasable price ids | (required) |
    /// | `STORAGE_URL` | Object-store base URL | (required) |
    /// | `STORAGE_BUCKET` | Object-store bucket | `documents` |
    /// | `STORAGE_SERVICE_KEY` | Object-store service credential | (required) |
    /// | `ANALYSIS_URL` | Content-generation endpoint | (required) |
    /// | `ANALYSIS_API_KEY` | Content-generation credential | (required) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("GATEWAY_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "sqlite:fundops.db?mode=rwc".to_string());

        let allowed_price_ids = required("ALLOWED_PRICE_IDS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            addr,
            database_url,
            public_base_url: required("PUBLIC_BASE_URL")?,
            auth_url: required("AUTH_URL")?,
            auth_anon_key: required("AUTH_ANON_KEY")?,
            twilio_account_sid: required("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: required("TWILIO_AUTH_TOKEN")?,
            twilio_api_key_sid: required("TWILIO_API_KEY_SID")?,
            twilio_api_key_secret: required("TWILIO_API_KEY_SECRET")?,
            twilio_app_sid: required("TWILIO_APP_SID")?,
            messaging_service_sid: env::var("MESSAGING_SERVICE_SID").ok(),
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            allowed_price_ids,
            storage_url: required("STORAGE_URL")?,
            storage_bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "documents".to_string()),
            storage_service_key: required("STORAGE_SERVICE_KEY")?,
            analysis_url: required("ANALYSIS_URL")?,
            analysis_api_key: required("ANALYSIS_API_KEY")?,
        })
    }

    /// Absolute URL of a webhook route, as the provider signed it.
    pub fn webhook_url(&self, path: &str) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), path)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid GATEWAY_ADDR format")]
    InvalidAddr,

    #[error("{0} environment variable is required")]
    Missing(&'static str),
}
