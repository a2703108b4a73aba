//! Envelopes over an ordered collection of items.
//!
//! A [`CompositeEnvelope`] wraps an `Envelope<Vec<T>>` and adds batch
//! helpers. Updates are copy-on-write: a new `Vec` is built and then swapped
//! in as the payload, and the swap refuses to happen on a sealed envelope.
//!
//! ## Batch policy
//!
//! [`CompositeEnvelope::process_payloads`] is all-or-nothing. One failing
//! item fails the batch, and the error reports how many failed out of how
//! many, with one failure record per failing item.

use std::fmt::Display;

use sealwire_types::{HeaderValue, Headers, ValidationError, ValidationFailure, ValidationTarget};

use crate::{
    Envelope, EnvelopeBuilder,
    signing::{SignatureGenerator, SignatureVerifier},
    validation::{HeaderValidator, PayloadValidator, run_payload_rule},
};

/// Rule name recorded for items rejected by `process_payloads`.
pub const BATCH_ITEM_RULE: &str = "batch.item";

/// An envelope whose payload is an ordered list of `T`.
#[derive(Debug)]
pub struct CompositeEnvelope<T> {
    inner: Envelope<Vec<T>>,
}

impl<T> Clone for CompositeEnvelope<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> CompositeEnvelope<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            inner: Envelope::new(items),
        }
    }

    #[must_use]
    pub fn from_envelope(inner: Envelope<Vec<T>>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn envelope(&self) -> &Envelope<Vec<T>> {
        &self.inner
    }

    #[must_use]
    pub fn into_envelope(self) -> Envelope<Vec<T>> {
        self.inner
    }

    /// The items, or an empty slice when the envelope has no payload.
    #[must_use]
    pub fn items(&self) -> &[T] {
        self.inner.payload().map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.inner.is_sealed()
    }

    #[must_use]
    pub fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    /// Append one item.
    ///
    /// # Errors
    /// Returns [`ValidationError::AlreadySealed`] if the envelope is sealed.
    pub fn add_payload(&mut self, item: T) -> Result<(), ValidationError>
    where
        T: Clone,
    {
        self.add_payloads(std::iter::once(item))
    }

    /// Append several items in one replacement.
    ///
    /// # Errors
    /// Returns [`ValidationError::AlreadySealed`] if the envelope is sealed.
    pub fn add_payloads(&mut self, items: impl IntoIterator<Item = T>) -> Result<(), ValidationError>
    where
        T: Clone,
    {
        if self.is_sealed() {
            return Err(ValidationError::AlreadySealed);
        }
        let mut next = self.items().to_vec();
        next.extend(items);
        self.inner.replace_payload(next)
    }

    /// Remove the first item equal to `item`. Returns whether one was found.
    ///
    /// # Errors
    /// Returns [`ValidationError::AlreadySealed`] if the envelope is sealed,
    /// whether or not the item is present.
    pub fn remove_payload(&mut self, item: &T) -> Result<bool, ValidationError>
    where
        T: Clone + PartialEq,
    {
        if self.is_sealed() {
            return Err(ValidationError::AlreadySealed);
        }
        let Some(index) = self.items().iter().position(|x| x == item) else {
            return Ok(false);
        };
        let mut next = self.items().to_vec();
        next.remove(index);
        self.inner.replace_payload(next)?;
        Ok(true)
    }

    /// A new, unsealed composite holding the items that match. Headers are
    /// carried over. `self` is not touched.
    #[must_use]
    pub fn filter_payloads<P>(&self, mut predicate: P) -> Self
    where
        T: Clone,
        P: FnMut(&T) -> bool,
    {
        let kept: Vec<T> = self.items().iter().filter(|x| predicate(x)).cloned().collect();
        Self {
            inner: Envelope::from_parts(
                Some(kept),
                self.inner.headers().clone(),
                chrono::Utc::now(),
            ),
        }
    }

    /// Apply `f` to every item. All succeed, or the whole batch fails.
    ///
    /// Every item is processed even after a failure, so the error lists
    /// all failing items.
    ///
    /// # Errors
    /// Returns [`ValidationError::BatchFailed`] with the failed count, the
    /// total, and one [`ValidationTarget::Item`] failure per failing item.
    pub fn process_payloads<R, E, F>(&self, mut f: F) -> Result<Vec<R>, ValidationError>
    where
        F: FnMut(&T) -> Result<R, E>,
        E: Display,
    {
        let total = self.len();
        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (index, item) in self.items().iter().enumerate() {
            match f(item) {
                Ok(r) => results.push(r),
                Err(e) => failures.push(ValidationFailure::new(
                    BATCH_ITEM_RULE,
                    ValidationTarget::Item(index),
                    e.to_string(),
                )),
            }
        }

        if failures.is_empty() {
            Ok(results)
        } else {
            tracing::debug!(failed = failures.len(), total, "Batch processing failed");
            Err(ValidationError::BatchFailed {
                failed: failures.len(),
                total,
                failures,
            })
        }
    }

    /// Seal the whole collection.
    ///
    /// # Errors
    /// Same as [`Envelope::seal`].
    pub fn seal<G>(&self, generator: &G) -> Result<Self, ValidationError>
    where
        G: SignatureGenerator<Vec<T>> + ?Sized,
    {
        self.inner.seal(generator).map(Self::from_envelope)
    }

    /// # Errors
    /// Same as [`Envelope::verify_signature`].
    pub fn verify_signature<V>(&self, verifier: &V) -> Result<(), ValidationError>
    where
        V: SignatureVerifier<Vec<T>> + ?Sized,
    {
        self.inner.verify_signature(verifier)
    }
}

impl<T> From<Envelope<Vec<T>>> for CompositeEnvelope<T> {
    fn from(inner: Envelope<Vec<T>>) -> Self {
        Self::from_envelope(inner)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds a [`CompositeEnvelope`], validating each item as well as the
/// collection and headers.
pub struct CompositeEnvelopeBuilder<T> {
    items: Vec<T>,
    item_validators: Vec<Box<dyn PayloadValidator<T>>>,
    envelope: EnvelopeBuilder<Vec<T>>,
}

impl<T> Default for CompositeEnvelopeBuilder<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            item_validators: Vec::new(),
            envelope: EnvelopeBuilder::new(),
        }
    }
}

impl<T> CompositeEnvelopeBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_item(mut self, item: T) -> Self {
        self.items.push(item);
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.items.extend(items);
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.envelope = self.envelope.with_header(key, value);
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: Option<&str>) -> Self {
        self.envelope = self.envelope.with_correlation_id(id);
        self
    }

    /// A rule applied to each item; failures name the item index.
    #[must_use]
    pub fn with_item_validator(mut self, validator: impl PayloadValidator<T> + 'static) -> Self {
        self.item_validators.push(Box::new(validator));
        self
    }

    /// A rule applied to the collection as a whole.
    #[must_use]
    pub fn with_collection_validator(
        mut self,
        validator: impl PayloadValidator<Vec<T>> + 'static,
    ) -> Self {
        self.envelope = self.envelope.with_payload_validator(validator);
        self
    }

    #[must_use]
    pub fn with_header_validator(mut self, validator: impl HeaderValidator + 'static) -> Self {
        self.envelope = self.envelope.with_header_validator(validator);
        self
    }

    /// Validate items, collection and headers; fail with every failure found.
    ///
    /// # Errors
    /// Returns [`ValidationError::RulesFailed`].
    pub fn build(self) -> Result<CompositeEnvelope<T>, ValidationError> {
        let mut failures = Vec::new();
        for (index, item) in self.items.iter().enumerate() {
            for rule in &self.item_validators {
                run_payload_rule(
                    rule.as_ref(),
                    item,
                    ValidationTarget::Item(index),
                    &mut failures,
                );
            }
        }

        self.envelope
            .with_payload(self.items)
            .finish(failures)
            .map(CompositeEnvelope::from_envelope)
    }
}
