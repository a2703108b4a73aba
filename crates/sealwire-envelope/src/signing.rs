//! Signature providers for sealing envelopes.
//!
//! Sealing is algorithm-agnostic: an envelope only needs a
//! [`SignatureGenerator`] to seal and a [`SignatureVerifier`] to check.
//! Closures implement both traits, so tests and callers can plug in any
//! scheme. Two providers ship with the crate:
//!
//! - [`Ed25519Signer`] / [`Ed25519Verifier`]: asymmetric signatures over the
//!   payload's signing digest
//! - [`DigestSigner`]: keyless SHA-256 integrity digest (detects corruption,
//!   not forgery)
//!
//! ## Signing digest
//!
//! `SHA-256("sealwire:envelope:v1:" || len(payload_json) as u64 LE || payload_json)`
//!
//! The payload is rendered with `serde_json`. Payload types whose
//! serialization order is not stable (e.g. `HashMap` fields) will not
//! verify reliably; use ordered collections in signed payloads.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sealwire_types::constants;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Failure to produce a signature.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The payload could not be rendered into signing bytes.
    #[error("payload encoding failed: {0}")]
    Encoding(String),

    /// The signing key is unusable.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// Provider-specific failure.
    #[error("signature provider failed: {0}")]
    Provider(String),
}

/// Computes a signature string over a payload.
pub trait SignatureGenerator<T: ?Sized> {
    fn generate(&self, payload: &T) -> Result<String, SigningError>;
}

/// Checks a signature string against a payload.
///
/// A mismatch is a normal `false`, never an error.
pub trait SignatureVerifier<T: ?Sized> {
    fn verify(&self, payload: &T, signature: &str) -> bool;
}

impl<T: ?Sized, F> SignatureGenerator<T> for F
where
    F: Fn(&T) -> Result<String, SigningError>,
{
    fn generate(&self, payload: &T) -> Result<String, SigningError> {
        self(payload)
    }
}

impl<T: ?Sized, F> SignatureVerifier<T> for F
where
    F: Fn(&T, &str) -> bool,
{
    fn verify(&self, payload: &T, signature: &str) -> bool {
        self(payload, signature)
    }
}

/// Compute the signing digest for a payload.
///
/// # Errors
/// Returns [`SigningError::Encoding`] if the payload cannot be serialized.
pub fn signing_digest<T: Serialize + ?Sized>(payload: &T) -> Result<[u8; 32], SigningError> {
    let body = serde_json::to_vec(payload).map_err(|e| SigningError::Encoding(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(constants::SIGNING_DOMAIN);
    hasher.update((body.len() as u64).to_le_bytes());
    hasher.update(&body);

    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    Ok(digest)
}

// ---------------------------------------------------------------------------
// Ed25519
// ---------------------------------------------------------------------------

/// Signs envelope payloads with an ed25519 key. Signatures are lowercase hex.
#[derive(Clone)]
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// A signer with a fresh random key.
    #[must_use]
    pub fn random() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create from secret key bytes.
    #[must_use]
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    /// The matching verifier.
    #[must_use]
    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier {
            key: self.key.verifying_key(),
        }
    }

    /// Hex-encoded public key, for logs and key registries.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl<T: Serialize + ?Sized> SignatureGenerator<T> for Ed25519Signer {
    fn generate(&self, payload: &T) -> Result<String, SigningError> {
        let digest = signing_digest(payload)?;
        let signature = self.key.sign(&digest);
        Ok(hex::encode(signature.to_bytes()))
    }
}

/// Verifies ed25519 envelope signatures.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Create from public key bytes.
    ///
    /// # Errors
    /// Returns [`SigningError::InvalidKey`] if the bytes are not a valid
    /// curve point.
    pub fn from_bytes(public: &[u8; 32]) -> Result<Self, SigningError> {
        let key =
            VerifyingKey::from_bytes(public).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self { key })
    }
}

impl<T: Serialize + ?Sized> SignatureVerifier<T> for Ed25519Verifier {
    fn verify(&self, payload: &T, signature: &str) -> bool {
        let Ok(digest) = signing_digest(payload) else {
            return false;
        };
        let Ok(raw) = hex::decode(signature) else {
            return false;
        };
        let Ok(bytes) = <[u8; 64]>::try_from(raw.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&bytes);
        self.key.verify(&digest, &signature).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Keyless digest
// ---------------------------------------------------------------------------

/// Keyless "signature": the hex signing digest itself.
///
/// Detects accidental corruption; anyone can recompute it, so it proves
/// nothing about origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSigner;

impl<T: Serialize + ?Sized> SignatureGenerator<T> for DigestSigner {
    fn generate(&self, payload: &T) -> Result<String, SigningError> {
        signing_digest(payload).map(hex::encode)
    }
}

impl<T: Serialize + ?Sized> SignatureVerifier<T> for DigestSigner {
    fn verify(&self, payload: &T, signature: &str) -> bool {
        signing_digest(payload).is_ok_and(|digest| hex::encode(digest) == signature)
    }
}

/// Deterministic keys for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Ed25519Signer {
    /// A signer whose secret key is `[seed; 32]`.
    #[must_use]
    pub fn deterministic(seed: u8) -> Self {
        Self::from_bytes(&[seed; 32])
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Transfer {
        amount: u64,
        currency: &'static str,
    }

    #[test]
    fn ed25519_sign_and_verify() {
        let signer = Ed25519Signer::deterministic(7);
        let payload = Transfer { amount: 100, currency: "USD" };
        let sig = signer.generate(&payload).unwrap();
        assert_eq!(sig.len(), 128);
        assert!(signer.verifier().verify(&payload, &sig));
    }

    #[test]
    fn ed25519_rejects_other_payload() {
        let signer = Ed25519Signer::deterministic(7);
        let sig = signer
            .generate(&Transfer { amount: 100, currency: "USD" })
            .unwrap();
        let tampered = Transfer { amount: 101, currency: "USD" };
        assert!(!signer.verifier().verify(&tampered, &sig));
    }

    #[test]
    fn ed25519_rejects_other_key() {
        let payload = Transfer { amount: 1, currency: "EUR" };
        let sig = Ed25519Signer::deterministic(1).generate(&payload).unwrap();
        assert!(!Ed25519Signer::deterministic(2).verifier().verify(&payload, &sig));
    }

    #[test]
    fn ed25519_malformed_signature_is_mismatch() {
        let verifier = Ed25519Signer::deterministic(3).verifier();
        assert!(!SignatureVerifier::<u32>::verify(&verifier, &5, "not-hex"));
        assert!(!SignatureVerifier::<u32>::verify(&verifier, &5, "abcd"));
    }

    #[test]
    fn ed25519_verifier_from_public_bytes() {
        let signer = Ed25519Signer::deterministic(9);
        let public: [u8; 32] = hex::decode(signer.public_key_hex())
            .unwrap()
            .try_into()
            .unwrap();
        let verifier = Ed25519Verifier::from_bytes(&public).unwrap();
        let sig = signer.generate(&42_u32).unwrap();
        assert!(verifier.verify(&42_u32, &sig));
    }

    #[test]
    fn digest_is_deterministic() {
        let a = signing_digest(&Transfer { amount: 5, currency: "USD" }).unwrap();
        let b = signing_digest(&Transfer { amount: 5, currency: "USD" }).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn digest_signer_roundtrip() {
        let sig = DigestSigner.generate(&"hello").unwrap();
        assert!(DigestSigner.verify(&"hello", &sig));
        assert!(!DigestSigner.verify(&"hell0", &sig));
    }

    #[test]
    fn closures_are_providers() {
        let generator = |p: &u32| Ok::<_, SigningError>(format!("sig-{p}"));
        let verifier = |p: &u32, s: &str| s == format!("sig-{p}");
        let sig = generator.generate(&4_u32).unwrap();
        assert!(verifier.verify(&4_u32, &sig));
    }
}
