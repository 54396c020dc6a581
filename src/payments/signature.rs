// src/payments/signature.rs
//
// Stripe webhook signatures: header `t=<unix>,v1=<hex>`, where the hex part
// is HMAC-SHA256(secret, "<t>.<raw body>").

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    NotConfigured,
    #[error("signature header is missing")]
    MissingHeader,
    #[error("signature header is malformed")]
    Malformed,
    #[error("no signature matches the payload")]
    Mismatch,
    #[error("timestamp outside tolerance ({age_secs}s old)")]
    Expired { age_secs: i64 },
}

fn mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Hex signature for `payload` signed at `timestamp`.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hex::encode(mac(secret, timestamp, payload).finalize().into_bytes())
}

/// Header value as Stripe sends it.
pub fn header_value(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign(secret, timestamp, payload))
}

/// Accepts the payload when any `v1` entry matches and the timestamp is
/// within `tolerance_secs` of `now`.
pub fn verify(
    header: Option<&str>,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NotConfigured);
    }
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac(secret, timestamp, payload).verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let age_secs = now - timestamp;
    if tolerance_secs > 0 && age_secs.abs() > tolerance_secs {
        return Err(SignatureError::Expired { age_secs });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn accepts_own_signature() {
        let header = header_value(SECRET, 1_700_000_000, BODY);
        assert_eq!(verify(Some(&header), BODY, SECRET, 1_700_000_010, 300), Ok(()));
    }

    #[test]
    fn accepts_when_any_v1_matches() {
        let good = sign(SECRET, 100, BODY);
        let header = format!("t=100,v1=deadbeef,v0=ignored,v1={good}");
        assert_eq!(verify(Some(&header), BODY, SECRET, 100, 300), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = header_value(SECRET, 100, BODY);
        assert_eq!(
            verify(Some(&header), b"{}", SECRET, 100, 300),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify(Some(&header), BODY, "whsec_other", 100, 300),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_and_malformed_headers() {
        let header = header_value(SECRET, 100, BODY);
        assert_eq!(
            verify(Some(&header), BODY, SECRET, 1_000, 300),
            Err(SignatureError::Expired { age_secs: 900 })
        );
        assert_eq!(
            verify(Some("v1=abc"), BODY, SECRET, 100, 300),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify(None, BODY, SECRET, 100, 300),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify(Some(&header), BODY, "", 100, 300),
            Err(SignatureError::NotConfigured)
        );
    }
}
