//! Stripe webhook signature verification and event parsing
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`.
//! The signed payload is `"{t}.{raw body}"`, HMAC-SHA256 keyed with the
//! endpoint secret. Any `v1` entry may match (secrets roll over).

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::{PaymentError, PaymentIntent};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum accepted clock distance of a signed event, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Check a webhook signature header against the raw request body.
///
/// `now` is unix seconds.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();
    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("no v1 signature".into()));
    }
    // Rejects both stale and future-dated events
    let outside = now
        .checked_sub(timestamp)
        .map_or(true, |age| age.checked_abs().map_or(true, |age| age > tolerance_secs));
    if outside {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance".into()));
    }

    for signature in &signatures {
        // verify_slice compares in constant time
        if mac_for(secret, timestamp, payload)?.verify_slice(signature).is_ok() {
            return Ok(());
        }
    }
    Err(PaymentError::InvalidSignature("signature mismatch".into()))
}

/// Build a signature header value; used by tests and local tooling
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, PaymentError> {
    let signature = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
}

/// Webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, PaymentError> {
        serde_json::from_slice(payload)
            .map_err(|e| PaymentError::InvalidRequest(format!("malformed webhook event: {}", e)))
    }

    /// The payment intent of a `payment_intent.succeeded` event
    pub fn succeeded_intent(&self) -> Option<Result<PaymentIntent, PaymentError>> {
        if self.kind != PAYMENT_SUCCEEDED {
            return None;
        }
        Some(serde_json::from_value(self.data.object.clone()).map_err(|e| {
            PaymentError::InvalidRequest(format!("malformed payment intent in {}: {}", self.id, e))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn accepts_own_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign(body, SECRET, NOW).unwrap();
        assert!(verify_signature(body, &header, SECRET, NOW + 10, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1() {
        let body = b"payload";
        let good = sign(body, SECRET, NOW).unwrap();
        let good_sig = good.split_once("v1=").unwrap().1;
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);
        assert!(verify_signature(body, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = sign(b"original", SECRET, NOW).unwrap();
        assert!(verify_signature(b"tampered", &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
        assert!(verify_signature(b"original", &header, "whsec_other", NOW, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = sign(b"body", SECRET, NOW).unwrap();
        let err = verify_signature(b"body", &header, SECRET, NOW + 301, DEFAULT_TOLERANCE_SECS)
            .unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn rejects_future_and_extreme_timestamps() {
        let header = sign(b"body", SECRET, 9_000_000_000).unwrap();
        assert!(verify_signature(b"body", &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());

        let header = format!("t={},v1=00", i64::MIN);
        assert!(verify_signature(b"body", &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
        let header = format!("t={},v1=00", i64::MAX);
        assert!(verify_signature(b"body", &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn accepts_small_clock_skew() {
        let header = sign(b"body", SECRET, NOW + 30).unwrap();
        assert!(verify_signature(b"body", &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        for header in ["", "t=abc,v1=00", "v1=00", "t=1700000000", "t=1700000000,v1=zz"] {
            assert!(
                verify_signature(b"body", header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err(),
                "{}",
                header
            );
        }
    }

    #[test]
    fn extracts_succeeded_intent() {
        let event = WebhookEvent::parse(
            br#"{
                "id": "evt_1",
                "type": "payment_intent.succeeded",
                "data": {"object": {"id": "pi_1", "amount": 2900, "currency": "usd", "status": "succeeded"}}
            }"#,
        )
        .unwrap();
        let intent = event.succeeded_intent().unwrap().unwrap();
        assert_eq!(intent.id, "pi_1");

        let other = WebhookEvent::parse(
            br#"{"id": "evt_2", "type": "charge.refunded", "data": {"object": {}}}"#,
        )
        .unwrap();
        assert!(other.succeeded_intent().is_none());
    }
}
