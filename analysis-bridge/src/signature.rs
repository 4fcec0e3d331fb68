//! Webhook payload signing and verification.
//!
//! Both directions of the analysis webhook exchange are authenticated with
//! HMAC-SHA256 over the JSON body, hex-encoded in lowercase and sent as
//! `X-Webhook-Signature: sha256=<hex>`.

use std::fmt;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Algorithm prefix used in the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Shared secret used to sign and verify webhook bodies.
///
/// Never printed; the contents are cleared from memory on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret {
    inner: String,
}

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            inner: secret.into(),
        }
    }

    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// An empty secret still signs, but receivers treat it as "not configured".
    pub fn is_configured(&self) -> bool {
        !self.inner.trim().is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSecret")
            .field("inner", &"[REDACTED]")
            .finish()
    }
}

impl From<&str> for WebhookSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for WebhookSecret {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

fn compute_hex(bytes: &[u8], secret: &WebhookSecret) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(bytes);
    hex::encode(mac.finalize().into_bytes())
}

/// Sign raw body bytes. Returns 64 lowercase hex characters.
pub fn sign_bytes(bytes: &[u8], secret: &WebhookSecret) -> String {
    compute_hex(bytes, secret)
}

/// Sign the compact JSON serialization of `payload`.
///
/// Only fails when the value has no JSON form at all (for instance a map
/// with non-string keys).
pub fn sign_payload<T: Serialize + ?Sized>(
    payload: &T,
    secret: &WebhookSecret,
) -> serde_json::Result<String> {
    let body = serde_json::to_vec(payload)?;
    Ok(sign_bytes(&body, secret))
}

/// Verify `claimed` against the HMAC of the exact bytes received.
///
/// Malformed claims (wrong length, non-hex, uppercase) are simply `false`.
pub fn verify_signature(raw_body: &[u8], claimed: &str, secret: &WebhookSecret) -> bool {
    let expected = compute_hex(raw_body, secret);
    constant_time_eq(expected.as_bytes(), claimed.as_bytes())
}

/// Constant-time byte comparison.
///
/// Runs over every byte of `expected` regardless of `candidate`'s length or
/// contents; the length check is folded into the same accumulator.
pub fn constant_time_eq(expected: &[u8], candidate: &[u8]) -> bool {
    let mut equal = (expected.len() as u64).ct_eq(&(candidate.len() as u64));
    for (i, byte) in expected.iter().enumerate() {
        let other = candidate.get(i).copied().unwrap_or(!*byte);
        equal &= byte.ct_eq(&other);
    }
    equal.into()
}

/// Strip a leading `sha256=` from a header value.
pub fn strip_signature_prefix(header_value: &str) -> &str {
    let trimmed = header_value.trim();
    trimmed.strip_prefix(SIGNATURE_PREFIX).unwrap_or(trimmed)
}

/// Render a signature as a header value.
pub fn signature_header_value(signature: &str) -> String {
    format!("{SIGNATURE_PREFIX}{signature}")
}

/// Outcome of checking an inbound request's signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// No secret configured; verification was not enforced.
    Skipped,
    /// Secret configured but the request carried no signature.
    Missing,
    /// Signature present but did not match.
    Invalid,
    Valid,
}

impl SignatureCheck {
    pub fn is_accepted(self) -> bool {
        matches!(self, SignatureCheck::Skipped | SignatureCheck::Valid)
    }
}

/// Apply the receiver policy: skip when unconfigured, otherwise require a
/// matching signature over `raw_body`.
pub fn check_signature_header(
    raw_body: &[u8],
    header_value: Option<&str>,
    secret: &WebhookSecret,
) -> SignatureCheck {
    if !secret.is_configured() {
        return SignatureCheck::Skipped;
    }

    let claimed = match header_value.map(strip_signature_prefix) {
        Some(sig) if !sig.is_empty() => sig,
        _ => return SignatureCheck::Missing,
    };

    if verify_signature(raw_body, claimed, secret) {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Invalid
    }
}
