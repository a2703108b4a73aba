//! Pluggable encryption providers.
//!
//! The encrypting stage only sees the [`Encryptor`] trait. Two providers
//! ship here:
//!
//! - [`AesGcmEncryptor`]: AES-256-GCM. Output is `nonce(12) || ciphertext || tag(16)`
//!   with a fresh random nonce per call.
//! - [`ChainedEncryptor`]: applies several encryptors in order and undoes
//!   them in reverse.

use std::sync::Arc;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

/// AES-256 key length.
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce length.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_SIZE: usize = 16;

/// Failure inside an encryption provider.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    CiphertextTooShort { len: usize, min: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Symmetric encryption of whole byte buffers.
pub trait Encryptor: Send + Sync {
    /// Identity reported in capability maps.
    fn name(&self) -> &str;

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

impl<E: Encryptor + ?Sized> Encryptor for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        (**self).encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        (**self).decrypt(ciphertext)
    }
}

impl<E: Encryptor + ?Sized> Encryptor for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        (**self).encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        (**self).decrypt(ciphertext)
    }
}

// ---------------------------------------------------------------------------
// AES-256-GCM
// ---------------------------------------------------------------------------

/// AES-256-GCM with a random nonce per message.
#[derive(Clone)]
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    #[must_use]
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// # Errors
    /// Returns [`CryptoError::InvalidKey`] unless `key` is exactly 32 bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self, CryptoError> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// A fresh random key. The key cannot be recovered afterwards.
    #[must_use]
    pub fn random() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self::new(&key)
    }
}

impl std::fmt::Debug for AesGcmEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmEncryptor").finish_non_exhaustive()
    }
}

impl Encryptor for AesGcmEncryptor {
    fn name(&self) -> &str {
        "aes-256-gcm"
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let min = NONCE_SIZE + TAG_SIZE;
        if ciphertext.len() < min {
            return Err(CryptoError::CiphertextTooShort {
                len: ciphertext.len(),
                min,
            });
        }
        let (nonce_bytes, body) = ciphertext.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Chaining
// ---------------------------------------------------------------------------

/// Several encryptors applied in sequence.
///
/// `encrypt` runs stages first to last; `decrypt` runs them last to first.
/// An empty chain is the identity.
#[derive(Default)]
pub struct ChainedEncryptor {
    stages: Vec<Box<dyn Encryptor>>,
    name: String,
}

impl ChainedEncryptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(mut self, stage: impl Encryptor + 'static) -> Self {
        if !self.name.is_empty() {
            self.name.push('+');
        }
        self.name.push_str(stage.name());
        self.stages.push(Box::new(stage));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for ChainedEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedEncryptor")
            .field("stages", &self.name)
            .finish()
    }
}

impl Encryptor for ChainedEncryptor {
    fn name(&self) -> &str {
        if self.name.is_empty() { "identity" } else { &self.name }
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut data = plaintext.to_vec();
        for stage in &self.stages {
            data = stage.encrypt(&data)?;
        }
        Ok(data)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut data = ciphertext.to_vec();
        for stage in self.stages.iter().rev() {
            data = stage.decrypt(&data)?;
        }
        Ok(data)
    }
}
