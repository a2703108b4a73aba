//! Validating builder for [`Envelope`].
//!
//! ```text
//!   with_payload / with_header / with_*_validator
//!                    │
//!                    ▼
//!   build() ── run ALL rules ──▶ any failure? ──yes──▶ Err(RulesFailed[..all..])
//!                                     │
//!                                     no
//!                                     ▼
//!                              Ok(Envelope)  ──seal()──▶ build_and_seal
//! ```
//!
//! Built-in rules run alongside the caller's: the payload must be present
//! and header keys must not be blank.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sealwire_types::{
    CorrelationId, HeaderValue, Headers, ValidationError, ValidationFailure, ValidationTarget,
    constants::headers,
};

use crate::{
    Envelope,
    signing::SignatureGenerator,
    validation::{
        HeaderValidator, PayloadValidator, ValidationResult, rules, run_header_rule,
        run_payload_rule,
    },
};

/// Accumulates payload, headers and validators, then builds an envelope.
pub struct EnvelopeBuilder<T> {
    payload: Option<T>,
    headers: BTreeMap<String, HeaderValue>,
    payload_validators: Vec<Box<dyn PayloadValidator<T>>>,
    header_validators: Vec<Box<dyn HeaderValidator>>,
}

impl<T> Default for EnvelopeBuilder<T> {
    fn default() -> Self {
        Self {
            payload: None,
            headers: BTreeMap::new(),
            payload_validators: Vec::new(),
            header_validators: Vec::new(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for EnvelopeBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeBuilder")
            .field("payload", &self.payload)
            .field("headers", &self.headers)
            .field("payload_validators", &self.payload_validators.len())
            .field("header_validators", &self.header_validators.len())
            .finish()
    }
}

impl<T> EnvelopeBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_payload(mut self, payload: T) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set a header, replacing any previous value under the same key.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn without_header(mut self, key: &str) -> Self {
        self.headers.remove(key);
        self
    }

    /// Set the correlation id header, generating a UUIDv7 when `None`.
    #[must_use]
    pub fn with_correlation_id(self, id: Option<&str>) -> Self {
        let value = match id {
            Some(id) => HeaderValue::from(id),
            None => HeaderValue::from(CorrelationId::new().to_string()),
        };
        self.with_header(headers::CORRELATION_ID, value)
    }

    /// Set the timestamp header, defaulting to now.
    #[must_use]
    pub fn with_timestamp(self, at: Option<DateTime<Utc>>) -> Self {
        self.with_header(headers::TIMESTAMP, at.unwrap_or_else(Utc::now))
    }

    #[must_use]
    pub fn with_content_type(self, content_type: &str) -> Self {
        self.with_header(headers::CONTENT_TYPE, content_type)
    }

    #[must_use]
    pub fn with_version(self, version: &str) -> Self {
        self.with_header(headers::VERSION, version)
    }

    /// Set a namespaced metadata header under `meta.<namespace>.<key>`.
    ///
    /// # Panics
    /// Panics if `namespace` or `key` is empty.
    #[must_use]
    pub fn with_metadata(
        self,
        namespace: &str,
        key: &str,
        value: impl Into<HeaderValue>,
    ) -> Self {
        assert!(!namespace.is_empty(), "metadata namespace must not be empty");
        assert!(!key.is_empty(), "metadata key must not be empty");
        let full_key = format!("{}.{namespace}.{key}", headers::METADATA_PREFIX);
        self.with_header(full_key, value)
    }

    #[must_use]
    pub fn with_payload_validator(mut self, validator: impl PayloadValidator<T> + 'static) -> Self {
        self.payload_validators.push(Box::new(validator));
        self
    }

    /// Add a header rule. It runs against every header at build time.
    #[must_use]
    pub fn with_header_validator(mut self, validator: impl HeaderValidator + 'static) -> Self {
        self.header_validators.push(Box::new(validator));
        self
    }

    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }

    /// Run every rule without building. Useful for form-style feedback.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        ValidationResult::from_failures(self.collect_failures())
    }

    fn collect_failures(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        match &self.payload {
            None => failures.push(ValidationFailure::new(
                rules::PAYLOAD_REQUIRED,
                ValidationTarget::Payload,
                "payload is required",
            )),
            Some(payload) => {
                for rule in &self.payload_validators {
                    run_payload_rule(rule.as_ref(), payload, ValidationTarget::Payload, &mut failures);
                }
            }
        }

        for (key, value) in &self.headers {
            if key.trim().is_empty() {
                failures.push(ValidationFailure::new(
                    rules::HEADER_KEY_NON_EMPTY,
                    ValidationTarget::Header(key.clone()),
                    "header key must not be blank",
                ));
            }
            if !value.is_encodable() {
                failures.push(ValidationFailure::new(
                    rules::HEADER_VALUE_ENCODABLE,
                    ValidationTarget::Header(key.clone()),
                    format!("{} value {value} cannot be encoded", value.type_name()),
                ));
            }
            for rule in &self.header_validators {
                run_header_rule(rule.as_ref(), key, value, &mut failures);
            }
        }

        failures
    }

    /// Validate and assemble an immutable envelope.
    ///
    /// # Errors
    /// Returns [`ValidationError::RulesFailed`] listing every failure found.
    pub fn build(self) -> Result<Envelope<T>, ValidationError> {
        self.finish(Vec::new())
    }

    /// Build, folding in failures a wrapping builder found on its own.
    pub(crate) fn finish(
        self,
        mut failures: Vec<ValidationFailure>,
    ) -> Result<Envelope<T>, ValidationError> {
        failures.extend(self.collect_failures());
        if !failures.is_empty() {
            tracing::debug!(
                failures = failures.len(),
                headers = self.headers.len(),
                "Envelope build rejected"
            );
            return Err(ValidationError::RulesFailed { failures });
        }

        Ok(Envelope::from_parts(
            self.payload,
            Headers::from_map(self.headers),
            Utc::now(),
        ))
    }

    /// [`build`](Self::build), then [`Envelope::seal`].
    ///
    /// # Errors
    /// Any build failure, or any sealing failure.
    pub fn build_and_seal<G>(self, generator: &G) -> Result<Envelope<T>, ValidationError>
    where
        G: SignatureGenerator<T> + ?Sized,
    {
        self.build()?.seal(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        signing::DigestSigner,
        validation::{header_rule, payload_rule},
    };

    #[test]
    fn build_requires_payload() {
        let err = EnvelopeBuilder::<String>::new().build().unwrap_err();
        assert!(err.failures().iter().any(|f| f.rule == rules::PAYLOAD_REQUIRED));
    }

    #[test]
    fn build_succeeds_with_payload_and_headers() {
        let env = EnvelopeBuilder::new()
            .with_payload(42_u64)
            .with_header("Region", "eu")
            .build()
            .unwrap();
        assert_eq!(env.payload(), Some(&42));
        assert_eq!(env.try_get_header::<String>("Region").as_deref(), Some("eu"));
        assert!(!env.is_sealed());
    }

    #[test]
    fn two_failing_header_rules_are_both_reported() {
        let no_spaces = header_rule("no-spaces", |_k: &str, v: &HeaderValue| match v.as_str() {
            Some(s) if s.contains(' ') => Err("value contains a space".to_string()),
            _ => Ok(()),
        });
        let max_len = header_rule("max-len-4", |_k: &str, v: &HeaderValue| {
            if v.to_string().len() > 4 {
                Err("value longer than 4".to_string())
            } else {
                Ok(())
            }
        });

        let err = EnvelopeBuilder::new()
            .with_payload(1_u8)
            .with_header("Note", "a b c d")
            .with_header_validator(no_spaces)
            .with_header_validator(max_len)
            .build()
            .unwrap_err();

        let names: Vec<_> = err.failures().iter().map(|f| f.rule.as_str()).collect();
        assert_eq!(names, vec!["no-spaces", "max-len-4"]);
        assert!(
            err.failures()
                .iter()
                .all(|f| f.target == ValidationTarget::Header("Note".to_string()))
        );
    }

    #[test]
    fn payload_and_header_failures_aggregate() {
        let err = EnvelopeBuilder::new()
            .with_payload(-5_i64)
            .with_header("", "blank key")
            .with_payload_validator(payload_rule("positive", |v: &i64| {
                if *v > 0 { Ok(()) } else { Err("not positive".to_string()) }
            }))
            .build()
            .unwrap_err();

        assert_eq!(err.failures().len(), 2);
        assert!(err.failures().iter().any(|f| f.rule == "positive"));
        assert!(
            err.failures()
                .iter()
                .any(|f| f.rule == rules::HEADER_KEY_NON_EMPTY)
        );
    }

    #[test]
    fn non_finite_float_header_fails_build() {
        let err = EnvelopeBuilder::new()
            .with_payload(1_u8)
            .with_header("Ratio", f64::INFINITY)
            .with_header("Scale", 1.5)
            .build()
            .unwrap_err();

        assert_eq!(err.failures().len(), 1);
        let failure = &err.failures()[0];
        assert_eq!(failure.rule, rules::HEADER_VALUE_ENCODABLE);
        assert_eq!(failure.target, ValidationTarget::Header("Ratio".to_string()));
    }

    #[test]
    fn validate_is_a_dry_run() {
        let builder = EnvelopeBuilder::<u8>::new();
        assert!(!builder.validate().is_valid());
        let builder = builder.with_payload(1);
        assert!(builder.validate().is_valid());
        assert!(builder.build().is_ok());
    }

    #[test]
    fn correlation_id_generated_when_absent() {
        let env = EnvelopeBuilder::new()
            .with_payload(())
            .with_correlation_id(None)
            .build()
            .unwrap();
        let id = env.try_get_header::<String>(headers::CORRELATION_ID).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let other = EnvelopeBuilder::new()
            .with_payload(())
            .with_correlation_id(None)
            .build()
            .unwrap();
        assert_ne!(
            other.try_get_header::<String>(headers::CORRELATION_ID),
            Some(id)
        );
    }

    #[test]
    fn correlation_id_kept_when_given() {
        let env = EnvelopeBuilder::new()
            .with_payload(())
            .with_correlation_id(Some("abc"))
            .build()
            .unwrap();
        assert_eq!(
            env.try_get_header::<String>(headers::CORRELATION_ID).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn header_sugar() {
        let at = Utc::now();
        let env = EnvelopeBuilder::new()
            .with_payload(())
            .with_timestamp(Some(at))
            .with_content_type("application/json")
            .with_version("2")
            .with_metadata("billing", "tier", "gold")
            .build()
            .unwrap();

        assert_eq!(env.try_get_header::<DateTime<Utc>>(headers::TIMESTAMP), Some(at));
        assert_eq!(
            env.try_get_header::<String>(headers::CONTENT_TYPE).as_deref(),
            Some("application/json")
        );
        assert_eq!(env.try_get_header::<String>(headers::VERSION).as_deref(), Some("2"));
        assert_eq!(
            env.try_get_header::<String>("meta.billing.tier").as_deref(),
            Some("gold")
        );
    }

    #[test]
    #[should_panic(expected = "namespace must not be empty")]
    fn metadata_requires_namespace() {
        let _ = EnvelopeBuilder::<()>::new().with_metadata("", "k", "v");
    }

    #[test]
    fn without_header_removes() {
        let builder = EnvelopeBuilder::new()
            .with_payload(())
            .with_headers([("A", 1_i64), ("B", 2_i64)])
            .without_header("A");
        assert!(builder.header("A").is_none());
        assert!(builder.header("B").is_some());
    }

    #[test]
    fn build_and_seal_composes() {
        let env = EnvelopeBuilder::new()
            .with_payload("hello".to_string())
            .build_and_seal(&DigestSigner)
            .unwrap();
        assert!(env.is_sealed());
        assert!(env.verify_signature(&DigestSigner).is_ok());
    }

    #[test]
    fn build_and_seal_reports_build_failures_first() {
        let err = EnvelopeBuilder::<String>::new()
            .build_and_seal(&DigestSigner)
            .unwrap_err();
        assert!(matches!(err, ValidationError::RulesFailed { .. }));
    }
}
