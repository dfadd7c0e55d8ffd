//! Webhook signature verification and event parsing.
//!
//! The provider signs each delivery with
//! `Stripe-Signature: t=<unix_ts>,v1=<hex hmac-sha256>` where the signed
//! payload is `"{t}.{body}"`. Verification happens on the raw body before
//! any JSON parsing, rejects deliveries older than the replay window, and
//! compares digests in constant time.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use copperleaf_core::OrderId;

/// Maximum accepted age of a delivery, in seconds.
const REPLAY_TOLERANCE_SECS: i64 = 300;

/// Errors produced while authenticating a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Header missing or not in the `t=...,v1=...` shape.
    #[error("malformed signature header")]
    MalformedHeader,

    /// Delivery timestamp outside the replay window.
    #[error("delivery timestamp outside tolerance")]
    Expired,

    /// Digest did not match.
    #[error("signature mismatch")]
    Mismatch,

    /// Body was not valid event JSON.
    #[error("malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A parsed webhook event.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    /// Event type, e.g. `checkout.session.completed`.
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

/// The session object carried by checkout events.
#[derive(Debug, Deserialize)]
pub struct EventObject {
    /// Provider session identifier.
    pub id: String,
    #[serde(default)]
    pub metadata: EventMetadata,
}

/// Session metadata. Provider metadata values are strings on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct EventMetadata {
    order_id: Option<String>,
}

impl EventMetadata {
    /// The order this session was opened for, when present and well-formed.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id.as_deref().and_then(|raw| raw.parse().ok())
    }
}

impl WebhookEvent {
    /// Event type emitted when the buyer completes the hosted flow.
    pub const CHECKOUT_COMPLETED: &'static str = "checkout.session.completed";
}

/// Verify a delivery's signature header against the raw body, then parse it.
///
/// # Errors
///
/// Returns [`WebhookError`] when the header is malformed, the timestamp is
/// outside the replay window, the digest mismatches, or the body is not
/// valid event JSON.
pub fn verify_and_parse(
    secret: &SecretString,
    header: &str,
    body: &str,
    now_unix: i64,
) -> Result<WebhookEvent, WebhookError> {
    let (timestamp, signature) = split_header(header)?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedHeader)?;
    if (now_unix - ts).abs() > REPLAY_TOLERANCE_SECS {
        return Err(WebhookError::Expired);
    }

    let expected = compute_signature(secret, timestamp, body);
    if !constant_time_compare(&expected, signature) {
        return Err(WebhookError::Mismatch);
    }

    Ok(serde_json::from_str(body)?)
}

/// Compute the hex digest for a timestamped payload.
pub fn compute_signature(secret: &SecretString, timestamp: &str, body: &str) -> String {
    #[allow(clippy::expect_used)]
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{timestamp}.{body}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Extract the `t` and `v1` elements of the signature header.
fn split_header(header: &str) -> Result<(&str, &str), WebhookError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(v1)) => Ok((t, v1)),
        _ => Err(WebhookError::MalformedHeader),
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn secret() -> SecretString {
        SecretString::from("whsec_test_secret".to_owned())
    }

    fn completed_body() -> String {
        serde_json::json!({
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "metadata": { "order_id": "7" }
                }
            }
        })
        .to_string()
    }

    fn signed_header(ts: i64, body: &str) -> String {
        let sig = compute_signature(&secret(), &ts.to_string(), body);
        format!("t={ts},v1={sig}")
    }

    #[test]
    fn test_valid_signature_parses_event() {
        let body = completed_body();
        let header = signed_header(NOW, &body);

        let event = verify_and_parse(&secret(), &header, &body, NOW).unwrap();
        assert_eq!(event.kind, WebhookEvent::CHECKOUT_COMPLETED);
        assert_eq!(event.data.object.id, "cs_test_123");
        assert_eq!(event.data.object.metadata.order_id(), Some(OrderId::new(7)));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let body = completed_body();
        let header = signed_header(NOW, &body);
        let tampered = body.replace('7', "8");

        let result = verify_and_parse(&secret(), &header, &tampered, NOW);
        assert!(matches!(result, Err(WebhookError::Mismatch)));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let body = completed_body();
        let header = signed_header(NOW, &body);
        let other = SecretString::from("whsec_other".to_owned());

        let result = verify_and_parse(&other, &header, &body, NOW);
        assert!(matches!(result, Err(WebhookError::Mismatch)));
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let body = completed_body();
        let stale = NOW - REPLAY_TOLERANCE_SECS - 1;
        let header = signed_header(stale, &body);

        let result = verify_and_parse(&secret(), &header, &body, NOW);
        assert!(matches!(result, Err(WebhookError::Expired)));
    }

    #[test]
    fn test_malformed_header_variants() {
        let body = completed_body();
        for header in ["", "t=123", "v1=abc", "garbage"] {
            let result = verify_and_parse(&secret(), header, &body, NOW);
            assert!(
                matches!(result, Err(WebhookError::MalformedHeader)),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_event_without_order_id_parses() {
        let body = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_test_9", "metadata": {} } }
        })
        .to_string();
        let header = signed_header(NOW, &body);

        let event = verify_and_parse(&secret(), &header, &body, NOW).unwrap();
        assert_eq!(event.data.object.metadata.order_id(), None);
    }
}
