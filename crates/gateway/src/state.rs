//! Application state shared across handlers.

use std::sync::Arc;

use access::TokenVerifier;
use database::Database;
use doc_analysis::{Analyzer, BlobStore};
use payments::StripeClient;
use telephony::{SmsSender, TokenSigner};

use crate::config::Config;

/// Shared application state. Provider clients are constructed once at
/// startup; per-request handlers only borrow them.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Gateway configuration.
    pub config: Arc<Config>,
    /// Auth-provider token verifier.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Telephony SMS sender.
    pub sms: Arc<dyn SmsSender>,
    /// Softphone token signer.
    pub token_signer: Arc<TokenSigner>,
    /// Payment provider client.
    pub stripe: Arc<StripeClient>,
    /// Object store for uploaded documents.
    pub blobs: Arc<dyn BlobStore>,
    /// Content-generation service.
    pub analyzer: Arc<dyn Analyzer>,
}
