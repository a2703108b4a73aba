//! Text encoders and the encoding stage.
//!
//! [`HexEncoder`] writes uppercase hex and reads either case. Empty input
//! encodes to an empty string and decodes to no bytes.

use std::hash::Hash;

use sealwire_types::{CapabilityMap, Operation, SerializationError, capability::keys};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

use crate::serializer::{Serializer, ensure_not_cancelled};

/// A reversible bytes ↔ text transform.
pub trait Encoder: Send + Sync {
    /// Identity reported in capability maps.
    fn name(&self) -> &'static str;

    fn encode(&self, bytes: &[u8]) -> String;

    /// # Errors
    /// Returns a `Format` error tagged [`Operation::Decode`] for malformed text.
    fn decode(&self, text: &str) -> Result<Vec<u8>, SerializationError>;

    /// [`encode`](Self::encode) as raw bytes, reusing the encoded buffer.
    fn encode_to_vec(&self, bytes: &[u8]) -> Vec<u8> {
        self.encode(bytes).into_bytes()
    }

    fn capabilities(&self) -> CapabilityMap {
        CapabilityMap::new().with(keys::ENCODING, self.name())
    }
}

/// Uppercase base-16.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexEncoder;

impl Encoder for HexEncoder {
    fn name(&self) -> &'static str {
        "hex"
    }

    fn encode(&self, bytes: &[u8]) -> String {
        hex::encode_upper(bytes)
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>, SerializationError> {
        hex::decode(text).map_err(|e| {
            SerializationError::format(Operation::Decode, format!("invalid hex input: {e}"))
                .with_source(e)
        })
    }

    fn capabilities(&self) -> CapabilityMap {
        CapabilityMap::new()
            .with(keys::ENCODING, self.name())
            .with("encoding.case", "upper")
    }
}

/// Makes the inner stage's output text-safe.
#[derive(Debug)]
pub struct EncodingSerializer<S, E = HexEncoder> {
    inner: S,
    encoder: E,
}

impl<S: Serializer, E: Encoder> EncodingSerializer<S, E> {
    #[must_use]
    pub fn new(inner: S, encoder: E) -> Self {
        Self { inner, encoder }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn decode_frame(&self, bytes: &[u8]) -> Result<Vec<u8>, SerializationError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            SerializationError::format(Operation::Decode, format!("encoded input is not UTF-8: {e}"))
                .with_source(e)
        })?;
        self.encoder.decode(text)
    }
}

impl<S: Serializer, E: Encoder> Serializer for EncodingSerializer<S, E> {
    fn serialize_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + 'static,
    {
        let raw = self.inner.serialize_with(value, cancel)?;
        ensure_not_cancelled(cancel, Operation::Encode)?;
        Ok(self.encoder.encode_to_vec(&raw))
    }

    fn deserialize_with<T>(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<T, SerializationError>
    where
        T: DeserializeOwned + 'static,
    {
        ensure_not_cancelled(cancel, Operation::Decode)?;
        let raw = self
            .decode_frame(bytes)
            .map_err(SerializationError::with_target::<T>)?;
        self.inner.deserialize_with(&raw, cancel)
    }

    fn serialize_cached_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + Hash + 'static,
    {
        let raw = self.inner.serialize_cached_with(value, cancel)?;
        ensure_not_cancelled(cancel, Operation::Encode)?;
        Ok(self.encoder.encode_to_vec(&raw))
    }

    fn capabilities(&self) -> CapabilityMap {
        self.inner.capabilities().merged(self.encoder.capabilities())
    }
}

#[cfg(test)]
mod tests {
    use sealwire_types::SerializationErrorKind;

    use super::*;
    use crate::JsonSerializer;

    #[test]
    fn hex_encode_is_uppercase() {
        assert_eq!(HexEncoder.encode(&[0x0A, 0xFF]), "0AFF");
        assert_eq!(HexEncoder.encode(&[0xde, 0xad, 0xbe, 0xef]), "DEADBEEF");
    }

    #[test]
    fn hex_decode_accepts_both_cases() {
        assert_eq!(HexEncoder.decode("0AFF").unwrap(), vec![0x0A, 0xFF]);
        assert_eq!(HexEncoder.decode("0aff").unwrap(), vec![0x0A, 0xFF]);
    }

    #[test]
    fn hex_empty_roundtrip() {
        assert_eq!(HexEncoder.encode(&[]), "");
        assert!(HexEncoder.decode("").unwrap().is_empty());
    }

    #[test]
    fn hex_odd_length_is_format_error() {
        let err = HexEncoder.decode("0AF").unwrap_err();
        assert_eq!(err.kind(), SerializationErrorKind::Format);
        assert_eq!(err.operation(), Operation::Decode);
    }

    #[test]
    fn hex_bad_symbol_is_format_error() {
        for input in ["0A F", "ZZ", "0x0A"] {
            let err = HexEncoder.decode(input).unwrap_err();
            assert_eq!(err.kind(), SerializationErrorKind::Format, "input {input:?}");
        }
    }

    #[test]
    fn encoding_stage_produces_hex_text() {
        let s = EncodingSerializer::new(JsonSerializer::new(), HexEncoder);
        let bytes = s.serialize(&7_u8).unwrap();
        // JSON "7" is 0x37.
        assert_eq!(bytes, b"37");
        assert_eq!(s.deserialize::<u8>(&bytes).unwrap(), 7);
    }

    #[test]
    fn encoding_stage_rejects_non_utf8() {
        let s = EncodingSerializer::new(JsonSerializer::new(), HexEncoder);
        let err = s.deserialize::<u8>(&[0xFF, 0xFE]).unwrap_err();
        assert_eq!(err.operation(), Operation::Decode);
        assert!(err.target_type().is_some());
    }

    #[test]
    fn encoding_stage_capabilities() {
        let caps = EncodingSerializer::new(JsonSerializer::new(), HexEncoder).capabilities();
        assert_eq!(caps.get(keys::ENCODING), Some("hex"));
        assert_eq!(caps.get(keys::SERIALIZER), Some("json"));
    }
}
