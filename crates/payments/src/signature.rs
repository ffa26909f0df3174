//! Payment webhook signature verification.
//!
//! Distinct scheme from the telephony one: the provider signs
//! `"{timestamp}.{raw_body}"` with HMAC-SHA256 and sends
//! `t=<timestamp>,v1=<hex digest>` in its signature header. Verification
//! runs over the raw, unparsed body — re-serialized JSON is not guaranteed
//! byte-identical — and rejects timestamps outside the tolerance window to
//! bound replay.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PaymentsError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Replay tolerance for the signed timestamp.
pub const TOLERANCE_SECS: i64 = 300;

/// Verify a `t=...,v1=...` signature header against the raw request body.
///
/// Returns `Ok(false)` for a wrong-but-well-formed signature, `Err` for a
/// structurally invalid header. Callers treat both as rejection.
pub fn verify(signing_secret: &str, payload: &[u8], signature_header: &str) -> Result<bool> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| {
                    PaymentsError::MalformedSignature("non-numeric timestamp".into())
                })?);
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentsError::MalformedSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentsError::MalformedSignature("missing v1 signature".into()));
    }

    if (Utc::now().timestamp() - timestamp).abs() > TOLERANCE_SECS {
        return Ok(false);
    }

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    // Any one matching v1 entry passes (the provider sends several during
    // secret rotation).
    Ok(signatures.iter().any(|sig| constant_time_eq(sig, &expected)))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Compute a valid signature header for a payload (test support).
pub fn sign(signing_secret: &str, payload: &[u8], timestamp: i64) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123";
    const PAYLOAD: &[u8] = b"{\"id\":\"evt_1\",\"type\":\"invoice.paid\"}";

    #[test]
    fn valid_signature_verifies() {
        let header = sign(SECRET, PAYLOAD, Utc::now().timestamp());
        assert!(verify(SECRET, PAYLOAD, &header).unwrap());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = sign(SECRET, PAYLOAD, Utc::now().timestamp());
        let tampered = b"{\"id\":\"evt_1\",\"type\":\"invoice.paid\",\"x\":1}";
        assert!(!verify(SECRET, tampered, &header).unwrap());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = sign("whsec_other", PAYLOAD, Utc::now().timestamp());
        assert!(!verify(SECRET, PAYLOAD, &header).unwrap());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let header = sign(SECRET, PAYLOAD, Utc::now().timestamp() - 600);
        assert!(!verify(SECRET, PAYLOAD, &header).unwrap());
    }

    #[test]
    fn malformed_header_errors() {
        assert!(verify(SECRET, PAYLOAD, "garbage").is_err());
        assert!(verify(SECRET, PAYLOAD, "t=abc,v1=00").is_err());
        assert!(verify(SECRET, PAYLOAD, "t=1234567890").is_err());
        assert!(verify(SECRET, PAYLOAD, "").is_err());
    }

    #[test]
    fn rotation_allows_any_matching_v1() {
        let ts = Utc::now().timestamp();
        let good = sign(SECRET, PAYLOAD, ts);
        let v1 = good.split_once(",v1=").unwrap().1;
        let header = format!("t={ts},v1=deadbeef,v1={v1}");
        assert!(verify(SECRET, PAYLOAD, &header).unwrap());
    }
}
