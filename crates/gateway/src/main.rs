//! Gateway server binary.

use std::sync::Arc;

use access::HttpTokenVerifier;
use database::Database;
use doc_analysis::{HttpAnalyzer, HttpBlobStore};
use payments::StripeClient;
use telephony::{TokenSigner, TwilioClient};
use tracing::info;

use gateway::{AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting gateway");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Provider clients, constructed once for the process lifetime.
    let verifier = HttpTokenVerifier::new(&config.auth_url, &config.auth_anon_key)?;
    let sms = TwilioClient::new(
        TwilioClient::DEFAULT_BASE_URL,
        &config.twilio_account_sid,
        &config.twilio_auth_token,
    )?;
    let token_signer = TokenSigner {
        account_sid: config.twilio_account_sid.clone(),
        api_key_sid: config.twilio_api_key_sid.clone(),
        api_key_secret: config.twilio_api_key_secret.clone(),
        outgoing_application_sid: config.twilio_app_sid.clone(),
    };
    let stripe = StripeClient::new(StripeClient::DEFAULT_BASE_URL, &config.stripe_secret_key)?;
    let blobs = HttpBlobStore::new(
        &config.storage_url,
        &config.storage_bucket,
        &config.storage_service_key,
    )?;
    let analyzer = HttpAnalyzer::new(&config.analysis_url, &config.analysis_api_key)?;

    // Build application state
    let state = AppState {
        db,
        config: Arc::new(config.clone()),
        verifier: Arc::new(verifier),
        sms: Arc::new(sms),
        token_signer: Arc::new(token_signer),
        stripe: Arc::new(stripe),
        blobs: Arc::new(blobs),
        analyzer: Arc::new(analyzer),
    };

    // Build router and serve
    let app = gateway::routes::router().with_state(state);

    info!(addr = %config.addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
