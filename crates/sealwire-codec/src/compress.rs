//! Deflate stage (zlib framing via `flate2`).
//!
//! The read path inflates at most `max_decompressed_bytes`; a stream that
//! would grow past that is rejected instead of being buffered.

use std::{
    hash::Hash,
    io::{Read, Write},
};

use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};
use sealwire_types::{
    CapabilityMap, CompressionConfig, Operation, SerializationError, SerializationErrorKind,
    capability::keys,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;

use crate::serializer::{Serializer, ensure_not_cancelled};

/// Compresses the inner stage's output.
#[derive(Debug)]
pub struct CompressingSerializer<S> {
    inner: S,
    level: Compression,
    max_decompressed_bytes: usize,
}

impl<S: Serializer> CompressingSerializer<S> {
    /// Levels above 9 are clamped to 9.
    #[must_use]
    pub fn new(inner: S, config: CompressionConfig) -> Self {
        Self {
            inner,
            level: Compression::new(config.level.min(9)),
            max_decompressed_bytes: config.max_decompressed_bytes,
        }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn compress(&self, plain: &[u8]) -> Result<Vec<u8>, SerializationError> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(plain.len() / 2 + 16), self.level);
        encoder
            .write_all(plain)
            .map_err(|e| compression_error(Operation::Compress, e))?;
        encoder
            .finish()
            .map_err(|e| compression_error(Operation::Compress, e))
    }
}

/// Inflate a zlib stream of at most `limit` bytes.
fn decompress(packed: &[u8], limit: usize) -> Result<Vec<u8>, SerializationError> {
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut decoder = ZlibDecoder::new(packed).take(cap);
    let mut plain = Vec::with_capacity(packed.len().saturating_mul(2).min(limit));
    decoder
        .read_to_end(&mut plain)
        .map_err(|e| compression_error(Operation::Decompress, e))?;

    if plain.len() > limit {
        tracing::warn!(
            packed = packed.len(),
            limit,
            "Rejected compressed frame exceeding the inflate limit"
        );
        return Err(SerializationError::new(
            SerializationErrorKind::Compression,
            Operation::Decompress,
            format!("decompressed size exceeds limit of {limit} bytes"),
        ));
    }
    Ok(plain)
}

fn compression_error(operation: Operation, err: std::io::Error) -> SerializationError {
    SerializationError::new(SerializationErrorKind::Compression, operation, err.to_string())
        .with_source(err)
}

impl<S: Serializer> Serializer for CompressingSerializer<S> {
    fn serialize_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + 'static,
    {
        let plain = self.inner.serialize_with(value, cancel)?;
        ensure_not_cancelled(cancel, Operation::Compress)?;
        self.compress(&plain)
    }

    fn deserialize_with<T>(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<T, SerializationError>
    where
        T: DeserializeOwned + 'static,
    {
        ensure_not_cancelled(cancel, Operation::Decompress)?;
        let plain = decompress(bytes, self.max_decompressed_bytes).map_err(SerializationError::with_target::<T>)?;
        self.inner.deserialize_with(&plain, cancel)
    }

    fn serialize_cached_with<T>(
        &self,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, SerializationError>
    where
        T: Serialize + Hash + 'static,
    {
        let plain = self.inner.serialize_cached_with(value, cancel)?;
        ensure_not_cancelled(cancel, Operation::Compress)?;
        self.compress(&plain)
    }

    fn capabilities(&self) -> CapabilityMap {
        self.inner
            .capabilities()
            .with(keys::COMPRESSION, "deflate")
            .with(keys::COMPRESSION_LEVEL, self.level.level())
            .with(keys::COMPRESSION_MAX_DECOMPRESSED, self.max_decompressed_bytes)
    }
}
