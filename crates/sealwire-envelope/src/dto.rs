//! Flat transport snapshot of an [`Envelope`](crate::Envelope).
//!
//! The DTO uses a plain `HashMap` for headers and camelCase field names so
//! it lines up with other producers of the same wire shape. It is not
//! trusted: [`EnvelopeDto::check`] must pass before it becomes an envelope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sealwire_types::{HeaderValue, ValidationError};
use serde::{Deserialize, Serialize};

/// Serialization-friendly envelope snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDto<T> {
    pub payload: Option<T>,
    #[serde(default)]
    pub headers: HashMap<String, HeaderValue>,
    pub is_sealed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl<T> EnvelopeDto<T> {
    /// Whether the seal fields are consistent.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// Check the sealing invariant:
    /// `is_sealed ⇒ signature present ∧ sealed_at present ∧ sealed_at ≥ created_at`.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidSealState`] naming the broken part.
    pub fn check(&self) -> Result<(), ValidationError> {
        if !self.is_sealed {
            return Ok(());
        }
        let invalid = |reason: &str| ValidationError::InvalidSealState {
            reason: reason.to_string(),
        };

        match (&self.signature, self.sealed_at) {
            (None, _) => Err(invalid("sealed envelope has no signature")),
            (Some(sig), _) if sig.is_empty() => Err(invalid("sealed envelope has an empty signature")),
            (_, None) => Err(invalid("sealed envelope has no sealedAt")),
            (_, Some(sealed_at)) if sealed_at < self.created_at => {
                Err(invalid("sealedAt precedes createdAt"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{Envelope, signing::DigestSigner};

    fn sealed_dto() -> EnvelopeDto<String> {
        Envelope::new("order-1".to_string())
            .with_header("CorrelationId", "abc")
            .unwrap()
            .seal(&DigestSigner)
            .unwrap()
            .to_dto()
    }

    #[test]
    fn snapshot_of_sealed_envelope_is_valid() {
        let dto = sealed_dto();
        assert!(dto.is_sealed);
        assert!(dto.signature.is_some());
        assert!(dto.is_valid());
    }

    #[test]
    fn sealed_without_signature_is_invalid() {
        let mut dto = sealed_dto();
        dto.signature = None;
        assert!(!dto.is_valid());
        assert!(matches!(
            dto.check(),
            Err(ValidationError::InvalidSealState { .. })
        ));
    }

    #[test]
    fn sealed_at_before_created_at_is_invalid() {
        let mut dto = sealed_dto();
        dto.sealed_at = Some(dto.created_at - Duration::seconds(1));
        assert!(!dto.is_valid());
    }

    #[test]
    fn unsealed_dto_is_always_valid() {
        let dto = Envelope::new(5_u32).to_dto();
        assert!(!dto.is_sealed);
        assert!(dto.is_valid());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(sealed_dto()).unwrap();
        assert!(json.get("isSealed").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("sealedAt").is_some());
        assert_eq!(json["headers"]["CorrelationId"]["value"], "abc");
    }

    #[test]
    fn unsealed_dto_omits_seal_fields() {
        let json = serde_json::to_value(Envelope::new(1_u8).to_dto()).unwrap();
        assert!(json.get("sealedAt").is_none());
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn rehydrate_rejects_invalid_dto() {
        let mut dto = sealed_dto();
        dto.sealed_at = None;
        let err = Envelope::try_from(dto).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSealState { .. }));
    }

    #[test]
    fn rehydrate_preserves_seal() {
        let dto = sealed_dto();
        let env = Envelope::try_from(dto.clone()).unwrap();
        assert!(env.is_sealed());
        assert_eq!(env.signature(), dto.signature.as_deref());
        assert!(env.verify_signature(&DigestSigner).is_ok());
    }

    #[test]
    fn rehydrate_drops_stray_seal_fields_when_unsealed() {
        let mut dto = Envelope::new(3_i64).to_dto();
        dto.signature = Some("leftover".to_string());
        let env = Envelope::try_from(dto).unwrap();
        assert!(!env.is_sealed());
        assert!(env.signature().is_none());
    }
}
