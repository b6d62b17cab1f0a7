//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header carries a timestamp and one or more
//! signatures: `t=1723456789,v1=abcdef...`. The expected signature is
//! HMAC-SHA256 over `"{timestamp}.{payload}"` with the endpoint secret.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::StripeError;
use super::types::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted clock difference between the header timestamp and now.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// # Errors
///
/// Returns `StripeError::MalformedSignature` when the header cannot be
/// parsed, `StripeError::StaleTimestamp` when the timestamp is outside the
/// tolerance window, and `StripeError::SignatureMismatch` when no `v1`
/// signature matches.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &SecretString,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), StripeError> {
    let (timestamp, signatures) = parse_header(signature_header)?;

    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(StripeError::StaleTimestamp);
    }

    let expected = compute_signature(payload, timestamp, secret);

    if signatures.iter().any(|sig| constant_time_eq(sig, &expected)) {
        Ok(())
    } else {
        Err(StripeError::SignatureMismatch)
    }
}

/// Parse the event envelope from a verified payload.
///
/// # Errors
///
/// Returns `StripeError::Parse` on malformed JSON.
pub fn parse_event(payload: &[u8]) -> Result<StripeEvent, StripeError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Split the header into its timestamp and `v1` signatures.
fn parse_header(header: &str) -> Result<(i64, Vec<String>), StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = value.parse::<i64>().ok();
            }
            "v1" => signatures.push(value.to_owned()),
            _ => {}
        }
    }

    match (timestamp, signatures.is_empty()) {
        (Some(t), false) => Ok((t, signatures)),
        _ => Err(StripeError::MalformedSignature),
    }
}

/// HMAC-SHA256 over `"{timestamp}.{payload}"`, hex-encoded.
fn compute_signature(payload: &[u8], timestamp: i64, secret: &SecretString) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let digest = mac.finalize().into_bytes();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Length-constant comparison so signature checks don't leak a prefix match.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_723_456_789;

    fn secret() -> SecretString {
        SecretString::from("whsec_test_4eC39HqLyjWDarjtT1zdp7dc")
    }

    fn signed_header(payload: &[u8], timestamp: i64) -> String {
        let sig = compute_signature(payload, timestamp, &secret());
        format!("t={timestamp},v1={sig}")
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let header = signed_header(payload, NOW);
        assert!(
            verify_signature(payload, &header, &secret(), DEFAULT_TOLERANCE_SECS, NOW).is_ok()
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = br#"{"amount": 100}"#;
        let header = signed_header(payload, NOW);
        let tampered = br#"{"amount": 999}"#;
        assert!(matches!(
            verify_signature(tampered, &header, &secret(), DEFAULT_TOLERANCE_SECS, NOW),
            Err(StripeError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let header = signed_header(payload, NOW);
        let other = SecretString::from("whsec_a_different_endpoint_secret");
        assert!(matches!(
            verify_signature(payload, &header, &other, DEFAULT_TOLERANCE_SECS, NOW),
            Err(StripeError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let header = signed_header(payload, NOW - 3600);
        assert!(matches!(
            verify_signature(payload, &header, &secret(), DEFAULT_TOLERANCE_SECS, NOW),
            Err(StripeError::StaleTimestamp)
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let payload = b"{}";
        for header in ["", "t=abc", "v1=deadbeef", "nonsense"] {
            assert!(matches!(
                verify_signature(payload, header, &secret(), DEFAULT_TOLERANCE_SECS, NOW),
                Err(StripeError::MalformedSignature)
            ));
        }
    }

    #[test]
    fn test_second_v1_signature_accepted() {
        // Stripe sends multiple v1 entries during secret rotation
        let payload = b"{}";
        let good = compute_signature(payload, NOW, &secret());
        let header = format!("t={NOW},v1=0000,v1={good}");
        assert!(
            verify_signature(payload, &header, &secret(), DEFAULT_TOLERANCE_SECS, NOW).is_ok()
        );
    }

    #[test]
    fn test_parse_event() {
        let payload = br#"{"id":"evt_9","type":"payment_intent.payment_failed","data":{"object":{"id":"pi_9"}}}"#;
        let event = parse_event(payload).unwrap();
        assert_eq!(event.event_type, "payment_intent.payment_failed");
        assert_eq!(event.payment_intent_id(), Some("pi_9"));
    }
}
