//! Envelopes on the wire.
//!
//! An envelope travels as its [`EnvelopeDto`], serialized through any
//! pipeline. Decoding rehydrates through `Envelope::try_from`, so a DTO that
//! breaks the seal invariant is rejected with a `ValidationError` rather than
//! becoming a half-sealed envelope.
//!
//! When the pipeline uses a [`RegistryResolver`](crate::RegistryResolver),
//! register `EnvelopeDto<T>` (and `EnvelopeDto<Vec<T>>` for composites), not
//! `T`: the DTO is the type the pipeline sees.

use sealwire_envelope::{CompositeEnvelope, Envelope, EnvelopeDto};
use sealwire_types::Result;
use serde::{Serialize, de::DeserializeOwned};

use crate::serializer::Serializer;

/// Encodes and decodes envelopes through a serializer pipeline.
#[derive(Debug)]
pub struct EnvelopeCodec<S> {
    serializer: S,
}

impl<S: Serializer> EnvelopeCodec<S> {
    #[must_use]
    pub fn new(serializer: S) -> Self {
        Self { serializer }
    }

    #[must_use]
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.serializer
    }

    /// # Errors
    /// `SealwireError::Serialization` if any pipeline stage fails.
    pub fn encode<T>(&self, envelope: &Envelope<T>) -> Result<Vec<u8>>
    where
        T: Serialize + Clone + 'static,
    {
        let bytes = self.serializer.serialize(&envelope.to_dto())?;
        tracing::debug!(
            sealed = envelope.is_sealed(),
            headers = envelope.headers().len(),
            len = bytes.len(),
            "Envelope encoded"
        );
        Ok(bytes)
    }

    /// # Errors
    /// - `SealwireError::Serialization` if any pipeline stage fails
    /// - `SealwireError::Validation` if the decoded DTO has an invalid seal state
    pub fn decode<T>(&self, bytes: &[u8]) -> Result<Envelope<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let dto: EnvelopeDto<T> = self.serializer.deserialize(bytes)?;
        Ok(Envelope::try_from(dto)?)
    }

    /// # Errors
    /// As [`encode`](Self::encode).
    pub fn encode_composite<T>(&self, composite: &CompositeEnvelope<T>) -> Result<Vec<u8>>
    where
        T: Serialize + Clone + 'static,
    {
        self.encode(composite.envelope())
    }

    /// # Errors
    /// As [`decode`](Self::decode).
    pub fn decode_composite<T>(&self, bytes: &[u8]) -> Result<CompositeEnvelope<T>>
    where
        T: DeserializeOwned + 'static,
    {
        self.decode::<Vec<T>>(bytes).map(CompositeEnvelope::from)
    }
}

#[cfg(test)]
mod tests {
    use sealwire_envelope::{Ed25519Signer, EnvelopeBuilder};
    use sealwire_types::{SealwireError, ValidationError};

    use super::*;
    use crate::JsonSerializer;

    #[test]
    fn sealed_envelope_survives_the_wire() {
        let signer = Ed25519Signer::deterministic(3);
        let envelope = EnvelopeBuilder::new()
            .with_payload("hello".to_string())
            .with_header("tenant", "acme")
            .build_and_seal(&signer)
            .unwrap();

        let codec = EnvelopeCodec::new(JsonSerializer::new());
        let bytes = codec.encode(&envelope).unwrap();
        let back: Envelope<String> = codec.decode(&bytes).unwrap();

        assert!(back.is_sealed());
        assert_eq!(back.payload().map(String::as_str), Some("hello"));
        assert_eq!(back.signature(), envelope.signature());
        back.verify_signature(&signer.verifier()).unwrap();
    }

    #[test]
    fn dto_without_signature_is_rejected() {
        let json = br#"{"payload":1,"headers":{},"isSealed":true,"createdAt":"2026-01-01T00:00:00Z"}"#;
        let err = EnvelopeCodec::new(JsonSerializer::new())
            .decode::<u32>(json)
            .unwrap_err();
        assert!(matches!(
            err,
            SealwireError::Validation(ValidationError::InvalidSealState { .. })
        ));
    }

    #[test]
    fn malformed_bytes_are_serialization_errors() {
        let err = EnvelopeCodec::new(JsonSerializer::new())
            .decode::<u32>(b"[]")
            .unwrap_err();
        assert!(matches!(err, SealwireError::Serialization(_)));
    }

    #[test]
    fn composite_roundtrip() {
        let composite = CompositeEnvelope::new(vec![1_u8, 2, 3]);
        let codec = EnvelopeCodec::new(JsonSerializer::new());
        let back: CompositeEnvelope<u8> = codec
            .decode_composite(&codec.encode_composite(&composite).unwrap())
            .unwrap();
        assert_eq!(back.items(), &[1, 2, 3]);
        assert!(!back.is_sealed());
    }
}
