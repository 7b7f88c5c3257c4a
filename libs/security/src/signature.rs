//! Ed25519 verification of Telnyx webhook signatures.
//!
//! Telnyx signs `timestamp || raw_body` and sends the base64 signature and the
//! timestamp in two headers. The body must be the exact bytes received.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use http::HeaderMap;
use time::OffsetDateTime;
use tnx_core::AuthError;

pub const SIGNATURE_HEADER: &str = "telnyx-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "telnyx-timestamp";
/// Wire names as Telnyx sends them; header lookup is case-insensitive but
/// the `X-` prefix is part of the name.
pub const X_SIGNATURE_HEADER: &str = "x-telnyx-signature-ed25519";
pub const X_TIMESTAMP_HEADER: &str = "x-telnyx-timestamp";

/// Verifies one request against a base64 public key.
///
/// Header presence is checked before any decoding.
pub fn verify(raw_body: &[u8], headers: &HeaderMap, public_key_b64: &str) -> Result<(), AuthError> {
    let (signature, timestamp) = signature_headers(headers)?;
    let key = decode_key(public_key_b64)?;
    check(&key, signature, timestamp, raw_body)
}

/// Verifier holding a decoded key, built once at startup.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
    tolerance: Option<Duration>,
}

impl SignatureVerifier {
    pub fn new(public_key_b64: &str) -> Result<Self, AuthError> {
        Ok(Self {
            key: decode_key(public_key_b64)?,
            tolerance: None,
        })
    }

    pub fn from_key(key: VerifyingKey) -> Self {
        Self {
            key,
            tolerance: None,
        }
    }

    /// Rejects timestamps further than `tolerance` from the local clock.
    pub fn with_tolerance(mut self, tolerance: Option<Duration>) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn verify(&self, raw_body: &[u8], headers: &HeaderMap) -> Result<(), AuthError> {
        self.verify_at(raw_body, headers, OffsetDateTime::now_utc().unix_timestamp())
    }

    pub(crate) fn verify_at(
        &self,
        raw_body: &[u8],
        headers: &HeaderMap,
        now_unix: i64,
    ) -> Result<(), AuthError> {
        let (signature, timestamp) = signature_headers(headers)?;
        check(&self.key, signature, timestamp, raw_body)?;
        if let Some(tolerance) = self.tolerance {
            let sent = std::str::from_utf8(timestamp)
                .ok()
                .and_then(|ts| ts.trim().parse::<i64>().ok())
                .ok_or(AuthError::Stale)?;
            let skew = now_unix.abs_diff(sent);
            if skew > tolerance.as_secs() {
                return Err(AuthError::Stale);
            }
        }
        Ok(())
    }
}

fn signature_headers(headers: &HeaderMap) -> Result<(&[u8], &[u8]), AuthError> {
    let pick = |primary: &str, fallback: &str| {
        headers
            .get(primary)
            .or_else(|| headers.get(fallback))
            .map(|value| value.as_bytes())
            .filter(|value| !value.is_empty())
    };
    let signature = pick(X_SIGNATURE_HEADER, SIGNATURE_HEADER);
    let timestamp = pick(X_TIMESTAMP_HEADER, TIMESTAMP_HEADER);
    match (signature, timestamp) {
        (Some(signature), Some(timestamp)) => Ok((signature, timestamp)),
        _ => Err(AuthError::MissingHeaders),
    }
}

fn decode_key(public_key_b64: &str) -> Result<VerifyingKey, AuthError> {
    let bytes = B64
        .decode(public_key_b64.trim())
        .map_err(|_| AuthError::BadEncoding)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| AuthError::BadEncoding)?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| AuthError::BadEncoding)
}

fn check(
    key: &VerifyingKey,
    signature_b64: &[u8],
    timestamp: &[u8],
    raw_body: &[u8],
) -> Result<(), AuthError> {
    let raw = B64
        .decode(signature_b64)
        .map_err(|_| AuthError::BadEncoding)?;
    let raw: [u8; 64] = raw.try_into().map_err(|_| AuthError::BadEncoding)?;
    let signature = Signature::from_bytes(&raw);

    let mut payload = Vec::with_capacity(timestamp.len() + raw_body.len());
    payload.extend_from_slice(timestamp);
    payload.extend_from_slice(raw_body);
    key.verify(&payload, &signature)
        .map_err(|_| AuthError::Invalid)
}
