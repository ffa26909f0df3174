//! Softphone access-token minting.
//!
//! The provider expects a compact HS256 JWT carrying a voice grant bound to
//! the agent's client identity. Built on the hmac/sha2/base64 stack already
//! used for signature verification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{Result, TelephonyError};

type HmacSha256 = Hmac<Sha256>;

/// Credential material for token minting.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    pub account_sid: String,
    pub api_key_sid: String,
    pub api_key_secret: String,
    pub outgoing_application_sid: String,
}

impl TokenSigner {
    /// Mint an access token for a softphone identity, valid for `ttl_secs`.
    pub fn mint(&self, identity: &str, ttl_secs: i64) -> Result<String> {
        let now = Utc::now().timestamp();
        let header = json!({
            "alg": "HS256",
            "typ": "JWT",
            "cty": "twilio-fpa;v=1",
        });
        let claims = json!({
            "jti": format!("{}-{}", self.api_key_sid, Uuid::new_v4()),
            "iss": self.api_key_sid,
            "sub": self.account_sid,
            "iat": now,
            "exp": now + ttl_secs,
            "grants": {
                "identity": identity,
                "voice": {
                    "outgoing": { "application_sid": self.outgoing_application_sid },
                    "incoming": { "allow": true },
                },
            },
        });

        let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = HmacSha256::new_from_slice(self.api_key_secret.as_bytes())
            .map_err(|e| TelephonyError::Token(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }
}
