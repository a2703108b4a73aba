//! # sealwire-codec
//!
//! Composable serialization pipeline for **SealWire** envelopes and payloads.
//!
//! - [`Serializer`]: the one trait every stage implements
//! - [`JsonSerializer`]: base stage with an injected [`TypeResolver`] and an
//!   optional FIFO [`SerializationCache`]
//! - [`CompressingSerializer`]: zlib/deflate
//! - [`EncryptingSerializer`]: flag-framed encryption with a size threshold
//! - [`EncodingSerializer`] / [`HexEncoder`]: text-safe output
//! - [`PipelineBuilder`]: explicit stage composition
//! - [`EnvelopeCodec`]: envelopes through their DTO
//! - [`offload`]: async entry points, cancellation and deadlines
//!
//! ## Pipeline
//!
//! ```text
//!   write:  value ─► json ─► deflate ─► [flag | encrypt] ─► hex ─► bytes
//!   read:   bytes ─► unhex ─► [flag ? decrypt] ─► inflate ─► json ─► value
//! ```
//!
//! Every stage is optional except the JSON base. Capability maps
//! accumulate along the chain and are for diagnostics only.

pub mod cache;
pub mod compress;
pub mod crypto;
pub mod encoding;
pub mod encrypting;
pub mod envelope_codec;
pub mod json;
pub mod offload;
pub mod pipeline;
pub mod resolver;
pub mod serializer;

pub use cache::{CacheStats, SerializationCache};
pub use compress::CompressingSerializer;
pub use crypto::{AesGcmEncryptor, ChainedEncryptor, CryptoError, Encryptor};
pub use encoding::{Encoder, EncodingSerializer, HexEncoder};
pub use encrypting::EncryptingSerializer;
pub use envelope_codec::EnvelopeCodec;
pub use json::JsonSerializer;
pub use offload::{
    decode_async, deserialize_async, encode_async, serialize_async, serialize_cached_async,
    with_deadline,
};
pub use pipeline::PipelineBuilder;
pub use resolver::{RegistryResolver, StandardResolver, TypeResolver};
pub use serializer::Serializer;
