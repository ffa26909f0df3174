//! Token verification against the auth provider.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{AccessError, Result};

/// A resolved authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Auth-provider principal id.
    pub id: String,
    /// Login email.
    pub email: String,
}

/// Validates a bearer token against the auth provider.
///
/// Object-safe so handlers can hold `Arc<dyn TokenVerifier>` and tests can
/// substitute a static mapping.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Resolve a raw bearer token to a principal.
    ///
    /// Rejected or malformed tokens fail with
    /// [`AccessError::Unauthenticated`]; provider outages fail with
    /// [`AccessError::Provider`].
    async fn verify(&self, token: &str) -> Result<Principal>;
}

/// User payload returned by the auth provider.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    email: String,
}

/// HTTP verifier against a GoTrue-style auth endpoint.
pub struct HttpTokenVerifier {
    http: reqwest::Client,
    user_url: String,
    anon_key: String,
}

impl HttpTokenVerifier {
    /// Build a verifier for the given auth-provider base URL and anon key.
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AccessError::Provider(e.to_string()))?;

        Ok(Self {
            http,
            user_url: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        })
    }
}

#[async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Principal> {
        let response = self
            .http
            .get(&self.user_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AccessError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AccessError::Unauthenticated("token rejected".to_string()));
        }
        if !response.status().is_success() {
            return Err(AccessError::Provider(format!(
                "auth provider returned {}",
                response.status()
            )));
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| AccessError::Provider(e.to_string()))?;

        Ok(Principal {
            id: user.id,
            email: user.email,
        })
    }
}

/// Extract the raw token from an `Authorization` header value.
///
/// Fails with `Unauthenticated` when the header is absent, the scheme is
/// not `Bearer`, or the token is empty.
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let header =
        header.ok_or_else(|| AccessError::Unauthenticated("missing authorization header".into()))?;

    match header.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AccessError::Unauthenticated(
            "expected Bearer credential".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc123")).unwrap(), "abc123");
        assert!(bearer_token(None).is_err());
        assert!(bearer_token(Some("Basic abc123")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
        assert!(bearer_token(Some("abc123")).is_err());
    }
}
