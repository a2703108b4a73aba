//! Explicit composition of serializer stages.
//!
//! ```text
//!   value ─► json ─► [deflate] ─► [encrypt + flag] ─► [hex] ─► bytes
//! ```
//!
//! Each call wraps the current stage in the next one, so the resulting type
//! spells out the whole chain, e.g.
//! `EncodingSerializer<EncryptingSerializer<CompressingSerializer<JsonSerializer>, AesGcmEncryptor>>`.
//! Stages are applied in call order and undone in reverse on the read path.

use std::sync::Arc;

use sealwire_types::{CacheConfig, CompressionConfig, EncryptionPolicy, PipelineConfig};

use crate::{
    compress::CompressingSerializer,
    crypto::Encryptor,
    encoding::{Encoder, EncodingSerializer, HexEncoder},
    encrypting::EncryptingSerializer,
    json::JsonSerializer,
    resolver::TypeResolver,
    serializer::Serializer,
};

/// Typestate builder: `S` is the chain assembled so far.
#[derive(Debug)]
pub struct PipelineBuilder<S> {
    serializer: S,
}

impl PipelineBuilder<JsonSerializer> {
    /// Start from a JSON base stage with the given cache settings.
    ///
    /// # Panics
    /// Panics if the cache is enabled with `max_entries == 0`; use
    /// [`from_config`](Self::from_config) to get an error instead.
    #[must_use]
    pub fn json(cache: &CacheConfig) -> Self {
        Self {
            serializer: JsonSerializer::new().with_cache(cache),
        }
    }

    /// Start from a checked [`PipelineConfig`].
    ///
    /// Only the base stage is built here. The optional stages depend on
    /// runtime values (the encryptor) and on the chain's static type, so the
    /// caller adds them from `config.compression` and `config.encryption`.
    ///
    /// # Errors
    /// Returns `SealwireError::Configuration` if the config fails its checks.
    pub fn from_config(config: &PipelineConfig) -> sealwire_types::Result<Self> {
        config.check()?;
        tracing::debug!(
            cache_enabled = config.cache.enabled,
            max_entries = config.cache.max_entries,
            compression = config.compression.is_some(),
            encryption = config.encryption.is_some(),
            "Building serialization pipeline from config"
        );
        Ok(Self::json(&config.cache))
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.serializer = self.serializer.with_resolver(resolver);
        self
    }
}

impl<S: Serializer> PipelineBuilder<S> {
    /// Wrap an existing stage.
    #[must_use]
    pub fn from_serializer(serializer: S) -> Self {
        Self { serializer }
    }

    #[must_use]
    pub fn compressed(self, config: CompressionConfig) -> PipelineBuilder<CompressingSerializer<S>> {
        PipelineBuilder {
            serializer: CompressingSerializer::new(self.serializer, config),
        }
    }

    #[must_use]
    pub fn encrypted<E: Encryptor>(
        self,
        encryptor: E,
        policy: EncryptionPolicy,
    ) -> PipelineBuilder<EncryptingSerializer<S, E>> {
        PipelineBuilder {
            serializer: EncryptingSerializer::new(self.serializer, encryptor, policy),
        }
    }

    #[must_use]
    pub fn encoded<E: Encoder>(self, encoder: E) -> PipelineBuilder<EncodingSerializer<S, E>> {
        PipelineBuilder {
            serializer: EncodingSerializer::new(self.serializer, encoder),
        }
    }

    #[must_use]
    pub fn hex_encoded(self) -> PipelineBuilder<EncodingSerializer<S, HexEncoder>> {
        self.encoded(HexEncoder)
    }

    #[must_use]
    pub fn build(self) -> S {
        self.serializer
    }
}
