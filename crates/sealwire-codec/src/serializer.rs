//! The [`Serializer`] contract shared by every pipeline stage.
//!
//! ## Design Principles
//!
//! - **One trait, many stages**: the base format and every decorator
//!   (compression, encryption, encoding) implement the same trait and wrap
//!   each other. Composition is explicit, see [`PipelineBuilder`](crate::PipelineBuilder).
//! - **Results, not panics**: every data-dependent failure is a
//!   [`SerializationError`] tagged with the failing [`Operation`].
//! - **Cancellable**: the `*_with` methods take a [`CancellationToken`] and
//!   check it between stages, and before any cache write.

use std::hash::Hash;

use sealwire_types::{CapabilityMap, Operation, SerializationError};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

/// Turns values into bytes and back.
///
/// Implementors provide the three required methods; the rest are derived.
pub trait Serializer: Send + Sync {
    /// Serialize, aborting with `Cancelled` once `cancel` fires.
    fn serialize_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + 'static;

    /// Deserialize, aborting with `Cancelled` once `cancel` fires.
    fn deserialize_with<T>(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<T, SerializationError>
    where
        T: DeserializeOwned + 'static;

    /// Diagnostics only. Never branch on the contents.
    fn capabilities(&self) -> CapabilityMap;

    /// Serialize through the result cache, if this pipeline has one.
    ///
    /// Stages without a cache fall through to [`serialize_with`](Self::serialize_with).
    /// Decorators forward to their inner stage and transform the result.
    fn serialize_cached_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + Hash + 'static,
    {
        self.serialize_with(value, cancel)
    }

    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + 'static,
    {
        self.serialize_with(value, &CancellationToken::new())
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, SerializationError>
    where
        T: DeserializeOwned + 'static,
    {
        self.deserialize_with(bytes, &CancellationToken::new())
    }

    fn serialize_cached<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + Hash + 'static,
    {
        self.serialize_cached_with(value, &CancellationToken::new())
    }

    /// An absent value serializes to zero bytes, not an error.
    fn serialize_optional<T>(&self, value: Option<&T>) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + 'static,
    {
        value.map_or_else(|| Ok(Vec::new()), |v| self.serialize(v))
    }

    /// Zero bytes deserialize to `None`.
    fn deserialize_optional<T>(&self, bytes: &[u8]) -> Result<Option<T>, SerializationError>
    where
        T: DeserializeOwned + 'static,
    {
        if bytes.is_empty() {
            return Ok(None);
        }
        self.deserialize(bytes).map(Some)
    }
}

/// `Err(Cancelled)` if the token has fired.
pub(crate) fn ensure_not_cancelled(
    cancel: &CancellationToken,
    operation: Operation,
) -> Result<(), SerializationError> {
    if cancel.is_cancelled() {
        return Err(SerializationError::cancelled(operation));
    }
    Ok(())
}
