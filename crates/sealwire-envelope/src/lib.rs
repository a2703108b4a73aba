//! # sealwire-envelope
//!
//! Immutable envelopes with a one-way seal.
//!
//! ## Lifecycle
//!
//! ```text
//!   EnvelopeBuilder ──build()──▶ Envelope (unsealed) ──seal(signer)──▶ Envelope (sealed)
//!         ▲                            │                                    │
//!         └──────── to_builder() ──────┴────────────────────────────────────┘
//!                  (seal dropped)
//! ```
//!
//! - [`Envelope`]: payload + headers + seal state; never modified in place
//! - [`EnvelopeBuilder`]: runs every validator and reports every failure
//! - [`CompositeEnvelope`]: an envelope over a `Vec<T>` with batch helpers
//! - [`EnvelopeDto`]: flat transport snapshot, checked before rehydration
//! - [`signing`]: signature provider traits and the ed25519 / digest providers

pub mod builder;
pub mod composite;
pub mod dto;
pub mod envelope;
pub mod signing;
pub mod validation;

pub use builder::EnvelopeBuilder;
pub use composite::{CompositeEnvelope, CompositeEnvelopeBuilder};
pub use dto::EnvelopeDto;
pub use envelope::{Envelope, SealState};
pub use signing::{
    DigestSigner, Ed25519Signer, Ed25519Verifier, SignatureGenerator, SignatureVerifier,
    SigningError,
};
pub use validation::{
    HeaderValidator, PayloadValidator, ValidationResult, header_rule, payload_rule,
};
