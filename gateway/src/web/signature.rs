//! Ed25519 webhook signature verification.
//!
//! Interaction webhooks (Discord style) sign every request with Ed25519.
//! The signed message is the `X-Signature-Timestamp` header value followed by
//! the raw request body; the signature arrives hex-encoded in
//! `X-Signature-Ed25519`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;
use tracing::warn;

/// Errors raised while building a verifier from configuration.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("public key is empty")]
    MissingKey,

    #[error("public key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("public key must be 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("public key is not a valid Ed25519 point: {0}")]
    InvalidKey(#[from] ed25519_dalek::SignatureError),
}

/// Anything that can vouch for a signed webhook request.
pub trait VerifyRequest: Send + Sync {
    /// Returns `true` only when `signature_hex` is a valid signature over
    /// `timestamp || body`.
    fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool;
}

/// Verifies requests against one configured Ed25519 public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Build a verifier from a hex-encoded public key.
    pub fn from_hex(public_key_hex: &str) -> Result<Self, SignatureError> {
        let public_key_hex = public_key_hex.trim();
        if public_key_hex.is_empty() {
            return Err(SignatureError::MissingKey);
        }

        let bytes = hex::decode(public_key_hex)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| SignatureError::InvalidLength(b.len()))?;

        Ok(Self {
            key: VerifyingKey::from_bytes(&bytes)?,
        })
    }

    pub fn from_key(key: VerifyingKey) -> Self {
        Self { key }
    }
}

impl VerifyRequest for SignatureVerifier {
    fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
        verify_with_key(&self.key, signature_hex, timestamp, body)
    }
}

/// Verify a webhook signature against a hex-encoded public key.
///
/// Any malformed input (key, signature, missing fields) yields `false`.
pub fn verify_webhook_signature(
    public_key_hex: &str,
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
) -> bool {
    match SignatureVerifier::from_hex(public_key_hex) {
        Ok(verifier) => verifier.verify(signature_hex, timestamp, body),
        Err(e) => {
            warn!(error = %e, "webhook_signature_invalid_key");
            false
        }
    }
}

/// Check `signature_hex` over `timestamp || body` with an already decoded key.
pub fn verify_with_key(
    key: &VerifyingKey,
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
) -> bool {
    if signature_hex.is_empty() || timestamp.is_empty() {
        warn!(
            has_signature = !signature_hex.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            "webhook_signature_missing_fields"
        );
        return false;
    }

    let signature = match hex::decode(signature_hex.trim())
        .ok()
        .and_then(|bytes| Signature::from_slice(&bytes).ok())
    {
        Some(s) => s,
        None => {
            warn!(
                signature_length = signature_hex.len(),
                "webhook_signature_malformed"
            );
            return false;
        }
    };

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    match key.verify(&message, &signature) {
        Ok(()) => true,
        Err(_) => {
            warn!(
                timestamp = %timestamp,
                body_length = body.len(),
                "webhook_signature_mismatch"
            );
            false
        }
    }
}
