//! Encryption stage with a one-byte self-describing frame.
//!
//! ## Frame
//!
//! ```text
//!   ┌──────┬──────────────────────────────┐
//!   │ flag │ body                         │
//!   └──────┴──────────────────────────────┘
//!     0x00   plaintext from the inner stage
//!     0x01   encryptor output over that plaintext
//! ```
//!
//! The flag alone decides how a frame is read, so plaintext and ciphertext
//! frames can share one store. Any other flag, or an empty input, is an
//! `InvalidFrame` error.
//!
//! Plaintext frames are only written when the [`EncryptionPolicy`] opts in
//! with `skip_small_objects` and the plaintext is under its threshold.

use std::hash::Hash;

use sealwire_types::{
    CapabilityMap, EncryptionPolicy, Operation, SerializationError, capability::keys,
    constants::{FRAME_FLAG_ENCRYPTED, FRAME_FLAG_PLAIN},
};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

use crate::{
    crypto::Encryptor,
    serializer::{Serializer, ensure_not_cancelled},
};

/// Encrypts the inner stage's output and frames it with a flag byte.
#[derive(Debug)]
pub struct EncryptingSerializer<S, E> {
    inner: S,
    encryptor: E,
    policy: EncryptionPolicy,
}

impl<S: Serializer, E: Encryptor> EncryptingSerializer<S, E> {
    #[must_use]
    pub fn new(inner: S, encryptor: E, policy: EncryptionPolicy) -> Self {
        Self {
            inner,
            encryptor,
            policy,
        }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    #[must_use]
    pub fn policy(&self) -> EncryptionPolicy {
        self.policy
    }

    fn frame<T: ?Sized>(
        &self,
        plaintext: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError> {
        ensure_not_cancelled(cancel, Operation::Encrypt)?;

        if self.policy.should_skip(plaintext.len()) {
            tracing::debug!(
                len = plaintext.len(),
                threshold = self.policy.threshold,
                "Below encryption threshold; writing plaintext frame"
            );
            let mut out = Vec::with_capacity(plaintext.len() + 1);
            out.push(FRAME_FLAG_PLAIN);
            out.extend_from_slice(plaintext);
            return Ok(out);
        }

        let ciphertext = self
            .encryptor
            .encrypt(plaintext)
            .map_err(|e| SerializationError::crypto(Operation::Encrypt, e).with_target::<T>())?;
        let mut out = Vec::with_capacity(ciphertext.len() + 1);
        out.push(FRAME_FLAG_ENCRYPTED);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }
}

impl<S: Serializer, E: Encryptor> Serializer for EncryptingSerializer<S, E> {
    fn serialize_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + 'static,
    {
        let plaintext = self.inner.serialize_with(value, cancel)?;
        self.frame::<T>(&plaintext, cancel)
    }

    fn deserialize_with<T>(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<T, SerializationError>
    where
        T: DeserializeOwned + 'static,
    {
        let Some((&flag, body)) = bytes.split_first() else {
            return Err(SerializationError::invalid_frame(
                "empty input: missing frame flag byte",
            )
            .with_target::<T>());
        };

        match flag {
            FRAME_FLAG_PLAIN => self.inner.deserialize_with(body, cancel),
            FRAME_FLAG_ENCRYPTED => {
                ensure_not_cancelled(cancel, Operation::Decrypt)?;
                let plaintext = self.encryptor.decrypt(body).map_err(|e| {
                    SerializationError::crypto(Operation::Decrypt, e).with_target::<T>()
                })?;
                self.inner.deserialize_with(&plaintext, cancel)
            }
            other => {
                tracing::warn!(flag = other, "Rejected frame with unknown flag");
                Err(SerializationError::invalid_frame(format!(
                    "unrecognized frame flag 0x{other:02X}"
                ))
                .with_target::<T>())
            }
        }
    }

    fn serialize_cached_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + Hash + 'static,
    {
        // Only plaintext is cached; every call gets a fresh nonce.
        let plaintext = self.inner.serialize_cached_with(value, cancel)?;
        self.frame::<T>(&plaintext, cancel)
    }

    fn capabilities(&self) -> CapabilityMap {
        self.inner
            .capabilities()
            .with(keys::ENCRYPTION_ENABLED, true)
            .with(keys::ENCRYPTION_SKIP_SMALL, self.policy.skip_small_objects)
            .with(keys::ENCRYPTION_THRESHOLD, self.policy.threshold)
            .with(keys::ENCRYPTION_ENCRYPTOR, self.encryptor.name())
    }
}
