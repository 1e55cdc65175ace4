//! Webhook signature verification.
//!
//! Stripe signs each delivery with the endpoint secret: the `Stripe-Signature` header carries a
//! unix timestamp (`t=...`) and one or more HMAC-SHA256 signatures (`v1=...`) computed over
//! `"{t}.{body}"`. Verification checks the timestamp against a replay tolerance and then
//! compares signatures in constant time. A payload is only parsed after its signature checks
//! out.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    data_objects::StripeEvent,
    error::{EventParseError, SignatureError, WebhookError},
};

type HmacSha256 = Hmac<Sha256>;

/// Verifies the signature header against the raw request body, using the current time.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    verify_signature_at(payload, signature_header, secret, tolerance_secs, Utc::now().timestamp())
}

/// Verification against an explicit `now`, so the tolerance window is testable.
pub fn verify_signature_at(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::StaleTimestamp);
    }
    for candidate in candidates {
        let decoded = match hex::decode(candidate) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice is constant-time
        if mac.verify_slice(&decoded).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

pub fn parse_event(payload: &[u8]) -> Result<StripeEvent, EventParseError> {
    serde_json::from_slice(payload).map_err(|e| EventParseError(e.to_string()))
}

/// Signature check followed by deserialization, as one step. Rejection happens before any byte
/// of the payload is interpreted.
pub fn verify_and_parse(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<StripeEvent, WebhookError> {
    verify_signature(payload, signature_header, secret, tolerance_secs)?;
    Ok(parse_event(payload)?)
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn header_for(payload: &[u8], secret: &str, timestamp: i64) -> String {
        format!("t={},v1={}", timestamp, sign(payload, secret, timestamp))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = header_for(payload, SECRET, now);
        assert!(verify_signature_at(payload, &header, SECRET, 300, now).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = header_for(payload, "wrong_secret", now);
        assert_eq!(verify_signature_at(payload, &header, SECRET, 300, now), Err(SignatureError::Mismatch));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let tampered = br#"{"type":"payment_intent.succeeded","amount":1}"#;
        let now = 1_700_000_000;
        let header = header_for(payload, SECRET, now);
        assert_eq!(verify_signature_at(tampered, &header, SECRET, 300, now), Err(SignatureError::Mismatch));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = header_for(payload, SECRET, now - 600);
        assert_eq!(verify_signature_at(payload, &header, SECRET, 300, now), Err(SignatureError::StaleTimestamp));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let payload = br#"{}"#;
        let now = 1_700_000_000;
        for header in ["", "v1=abcd", "t=notanumber,v1=abcd", "t=123"] {
            assert_eq!(
                verify_signature_at(payload, header, SECRET, 300, now),
                Err(SignatureError::MalformedHeader),
                "header: {header}"
            );
        }
    }

    #[test]
    fn extra_unknown_parts_are_tolerated() {
        let payload = br#"{"type":"account.updated"}"#;
        let now = 1_700_000_000;
        let header = format!("{},v0=deadbeef", header_for(payload, SECRET, now));
        assert!(verify_signature_at(payload, &header, SECRET, 300, now).is_ok());
    }

    #[test]
    fn events_parse_into_typed_views() {
        let payload = br#"{
            "id": "evt_1",
            "type": "payment_intent.payment_failed",
            "data": {
                "object": {
                    "id": "pi_123",
                    "last_payment_error": { "message": "Your card was declined" }
                }
            }
        }"#;
        let event = parse_event(payload).unwrap();
        assert_eq!(event.event_type, "payment_intent.payment_failed");
        let intent = event.payment_intent().unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.last_payment_error.unwrap().message.as_deref(), Some("Your card was declined"));
    }
}
