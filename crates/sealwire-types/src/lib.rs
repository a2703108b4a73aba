//! # sealwire-types
//!
//! Shared types, errors, and configuration for **SealWire**.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Errors**: [`ValidationError`], [`SerializationError`], [`SealwireError`] with `SW_ERR_` prefix codes
//! - **Headers**: [`HeaderValue`], [`Headers`], [`FromHeaderValue`]
//! - **Identifiers**: [`CorrelationId`]
//! - **Diagnostics**: [`CapabilityMap`]
//! - **Configuration**: [`PipelineConfig`], [`CacheConfig`], [`EncryptionPolicy`], [`CompressionConfig`]
//! - **Constants**: frame flags, defaults, well-known header keys

pub mod capability;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod ids;

pub use capability::CapabilityMap;
pub use config::*;
pub use error::*;
pub use header::*;
pub use ids::*;

// Constants are accessed via `sealwire_types::constants::FOO`
// (not re-exported to avoid name collisions).
