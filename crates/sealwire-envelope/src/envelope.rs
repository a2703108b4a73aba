//! # Envelope: immutable payload + headers with a one-way seal
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────────┐   seal(signer)   ┌────────┐
//!   │ UNSEALED ├─────────────────▶│ SEALED │
//!   └──────────┘                  └────────┘
//! ```
//!
//! There is no way back. `seal` returns a **new** envelope; the unsealed
//! original is left as it was. To edit a sealed envelope's contents, derive
//! a fresh builder with [`Envelope::to_builder`], which drops the seal.
//!
//! ## Invariants
//!
//! - **Seal consistency**: sealed ⇒ signature present ∧ `sealed_at ≥ created_at`.
//!   [`SealState`] makes the first half structural.
//! - **Immutability**: payload and headers live behind `Arc`s and are
//!   never modified in place. Header changes produce a new envelope.
//! - **Frozen when sealed**: every operation that would change a sealed
//!   envelope's payload or headers fails with `AlreadySealed`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sealwire_types::{
    FromHeaderValue, HeaderValue, Headers, ValidationError, ValidationFailure, ValidationTarget,
};

use crate::{
    EnvelopeBuilder, EnvelopeDto,
    signing::{SignatureGenerator, SignatureVerifier},
    validation::{PayloadValidator, ValidationResult, rules, run_payload_rule},
};

/// Whether an envelope is sealed, and if so with what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealState {
    /// Open for header changes; carries no signature.
    Unsealed,
    /// Frozen. The signature covers the payload at the time of sealing.
    Sealed {
        sealed_at: DateTime<Utc>,
        signature: String,
    },
}

impl SealState {
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed { .. })
    }
}

impl std::fmt::Display for SealState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsealed => write!(f, "UNSEALED"),
            Self::Sealed { .. } => write!(f, "SEALED"),
        }
    }
}

/// An immutable payload container with headers and an optional seal.
#[derive(Debug)]
pub struct Envelope<T> {
    payload: Option<Arc<T>>,
    headers: Headers,
    created_at: DateTime<Utc>,
    seal: SealState,
}

// Manual impl: cloning shares the payload, so `T: Clone` is not needed.
impl<T> Clone for Envelope<T> {
    fn clone(&self) -> Self {
        Self {
            payload: self.payload.clone(),
            headers: self.headers.clone(),
            created_at: self.created_at,
            seal: self.seal.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for Envelope<T> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
            && self.headers == other.headers
            && self.created_at == other.created_at
            && self.seal == other.seal
    }
}

impl<T> Envelope<T> {
    /// Wrap a payload directly, with no headers and no validation.
    #[must_use]
    pub fn new(payload: T) -> Self {
        Self::from_parts(Some(payload), Headers::new(), Utc::now())
    }

    pub(crate) fn from_parts(
        payload: Option<T>,
        headers: Headers,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payload: payload.map(Arc::new),
            headers,
            created_at,
            seal: SealState::Unsealed,
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_deref()
    }

    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    /// Typed header lookup. Absent or type-mismatched headers yield `None`.
    #[must_use]
    pub fn try_get_header<V: FromHeaderValue>(&self, key: &str) -> Option<V> {
        self.headers.try_get(key)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn seal_state(&self) -> &SealState {
        &self.seal
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.seal.is_sealed()
    }

    #[must_use]
    pub fn sealed_at(&self) -> Option<DateTime<Utc>> {
        match &self.seal {
            SealState::Sealed { sealed_at, .. } => Some(*sealed_at),
            SealState::Unsealed => None,
        }
    }

    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        match &self.seal {
            SealState::Sealed { signature, .. } => Some(signature),
            SealState::Unsealed => None,
        }
    }

    /// A new envelope with one header set. `self` is unchanged.
    ///
    /// # Errors
    /// Returns [`ValidationError::AlreadySealed`] on a sealed envelope, and
    /// [`ValidationError::InvalidHeader`] for an empty key or a value JSON
    /// cannot carry.
    pub fn with_header(
        &self,
        key: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Result<Self, ValidationError> {
        self.ensure_unsealed()?;
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::InvalidHeader {
                key,
                reason: "header key must not be empty".to_string(),
            });
        }
        let value = value.into();
        if !value.is_encodable() {
            return Err(ValidationError::InvalidHeader {
                key,
                reason: format!("{} value {value} cannot be encoded", value.type_name()),
            });
        }
        Ok(Self {
            headers: self.headers.with(key, value),
            ..self.clone()
        })
    }

    /// Sign the current payload and return a sealed copy.
    ///
    /// `sealed_at` is the current time, clamped so it never precedes
    /// `created_at`.
    ///
    /// # Errors
    /// - `AlreadySealed` if this envelope is sealed
    /// - `MissingPayload` if there is nothing to sign
    /// - `SigningFailed` if the generator fails or returns an empty signature
    pub fn seal<G>(&self, generator: &G) -> Result<Self, ValidationError>
    where
        G: SignatureGenerator<T> + ?Sized,
    {
        self.ensure_unsealed()?;
        let payload = self.payload().ok_or(ValidationError::MissingPayload)?;

        let signature = generator
            .generate(payload)
            .map_err(|e| ValidationError::SigningFailed {
                reason: e.to_string(),
            })?;
        if signature.is_empty() {
            return Err(ValidationError::SigningFailed {
                reason: "generator returned an empty signature".to_string(),
            });
        }

        let sealed_at = Utc::now().max(self.created_at);
        tracing::debug!(
            headers = self.headers.len(),
            created_at = %self.created_at,
            sealed_at = %sealed_at,
            "Envelope sealed"
        );

        Ok(Self {
            payload: self.payload.clone(),
            headers: self.headers.clone(),
            created_at: self.created_at,
            seal: SealState::Sealed {
                sealed_at,
                signature,
            },
        })
    }

    /// Check the seal's signature against the payload.
    ///
    /// # Errors
    /// - `NotSealed` if the envelope is unsealed
    /// - `MissingPayload` if a sealed envelope somehow has no payload
    /// - `SignatureMismatch` if the verifier rejects the signature
    pub fn verify_signature<V>(&self, verifier: &V) -> Result<(), ValidationError>
    where
        V: SignatureVerifier<T> + ?Sized,
    {
        let SealState::Sealed { signature, .. } = &self.seal else {
            return Err(ValidationError::NotSealed);
        };
        let payload = self.payload().ok_or(ValidationError::MissingPayload)?;

        if verifier.verify(payload, signature) {
            Ok(())
        } else {
            tracing::warn!(
                signature_len = signature.len(),
                "Envelope signature verification failed"
            );
            Err(ValidationError::SignatureMismatch)
        }
    }

    /// Check payload presence, seal consistency and, optionally, a
    /// payload-specific rule. Every failure is reported.
    pub fn validate(&self, payload_validator: Option<&dyn PayloadValidator<T>>) -> ValidationResult {
        let mut failures = Vec::new();

        match self.payload() {
            None => failures.push(ValidationFailure::new(
                rules::PAYLOAD_REQUIRED,
                ValidationTarget::Payload,
                "payload is required",
            )),
            Some(payload) => {
                if let Some(rule) = payload_validator {
                    run_payload_rule(rule, payload, ValidationTarget::Payload, &mut failures);
                }
            }
        }

        if let SealState::Sealed {
            sealed_at,
            signature,
        } = &self.seal
        {
            if signature.is_empty() {
                failures.push(ValidationFailure::new(
                    rules::SEAL_CONSISTENT,
                    ValidationTarget::Envelope,
                    "sealed envelope has an empty signature",
                ));
            }
            if *sealed_at < self.created_at {
                failures.push(ValidationFailure::new(
                    rules::SEAL_CONSISTENT,
                    ValidationTarget::Envelope,
                    format!(
                        "sealed_at {sealed_at} precedes created_at {}",
                        self.created_at
                    ),
                ));
            }
        }

        ValidationResult::from_failures(failures)
    }

    /// Transform the payload, carrying headers and `created_at` forward.
    ///
    /// The result is always **unsealed**: a signature over the old payload
    /// cannot vouch for the new one.
    #[must_use]
    pub fn map<R, F>(&self, mapper: F) -> Envelope<R>
    where
        F: FnOnce(&T) -> R,
    {
        if self.is_sealed() {
            tracing::debug!("Seal dropped by map: signature covered the original payload");
        }
        Envelope {
            payload: self.payload().map(|p| Arc::new(mapper(p))),
            headers: self.headers.clone(),
            created_at: self.created_at,
            seal: SealState::Unsealed,
        }
    }

    /// A builder pre-filled with this envelope's payload and headers.
    /// The seal and signature are not carried over.
    #[must_use]
    pub fn to_builder(&self) -> EnvelopeBuilder<T>
    where
        T: Clone,
    {
        let mut builder = EnvelopeBuilder::new().with_headers(self.headers.to_map());
        if let Some(payload) = self.payload() {
            builder = builder.with_payload(payload.clone());
        }
        builder
    }

    /// Flat snapshot for transport.
    #[must_use]
    pub fn to_dto(&self) -> EnvelopeDto<T>
    where
        T: Clone,
    {
        EnvelopeDto {
            payload: self.payload().cloned(),
            headers: self.headers.to_hash_map(),
            is_sealed: self.is_sealed(),
            created_at: self.created_at,
            sealed_at: self.sealed_at(),
            signature: self.signature().map(str::to_string),
        }
    }

    /// Swap in a new payload. Used by composite envelopes for their
    /// copy-on-write updates.
    pub(crate) fn replace_payload(&mut self, payload: T) -> Result<(), ValidationError> {
        self.ensure_unsealed()?;
        self.payload = Some(Arc::new(payload));
        Ok(())
    }

    fn ensure_unsealed(&self) -> Result<(), ValidationError> {
        if self.is_sealed() {
            return Err(ValidationError::AlreadySealed);
        }
        Ok(())
    }
}

impl<T> TryFrom<EnvelopeDto<T>> for Envelope<T> {
    type Error = ValidationError;

    /// Rehydrate an envelope, refusing DTOs that break the seal invariant.
    fn try_from(dto: EnvelopeDto<T>) -> Result<Self, Self::Error> {
        dto.check()?;

        let seal = match (dto.is_sealed, dto.sealed_at, dto.signature) {
            (true, Some(sealed_at), Some(signature)) => SealState::Sealed {
                sealed_at,
                signature,
            },
            (true, _, _) => {
                // check() already rejected this shape.
                return Err(ValidationError::InvalidSealState {
                    reason: "sealed DTO is missing seal fields".to_string(),
                });
            }
            (false, sealed_at, signature) => {
                if sealed_at.is_some() || signature.is_some() {
                    tracing::warn!("Ignoring seal fields on an unsealed envelope DTO");
                }
                SealState::Unsealed
            }
        };

        Ok(Self {
            payload: dto.payload.map(Arc::new),
            headers: Headers::from(dto.headers),
            created_at: dto.created_at,
            seal,
        })
    }
}
