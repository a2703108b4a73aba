//! Validation rules for payloads and headers.
//!
//! Validators return `Err(reason)` to reject. The builder and
//! [`Envelope::validate`](crate::Envelope::validate) run *every* rule and
//! collect every failure; nothing stops at the first one.
//!
//! ## Design Principles
//!
//! - **Named**: each rule has a name that ends up in the failure record
//! - **Pure**: rules only inspect, they never modify
//! - **Aggregated**: one pass reports all problems

use std::marker::PhantomData;

use sealwire_types::{HeaderValue, ValidationError, ValidationFailure, ValidationTarget};

/// A rule applied to a payload.
pub trait PayloadValidator<T: ?Sized>: Send + Sync {
    /// Rule name, reported in failures.
    fn name(&self) -> &str;

    fn validate(&self, payload: &T) -> Result<(), String>;
}

/// A rule applied to every header of an envelope.
pub trait HeaderValidator: Send + Sync {
    /// Rule name, reported in failures.
    fn name(&self) -> &str;

    fn validate(&self, key: &str, value: &HeaderValue) -> Result<(), String>;
}

/// A closure-backed [`PayloadValidator`]. Built with [`payload_rule`].
pub struct PayloadRule<T: ?Sized, F> {
    name: String,
    check: F,
    _payload: PhantomData<fn(&T)>,
}

/// Wrap a closure as a named payload rule.
pub fn payload_rule<T: ?Sized, F>(name: impl Into<String>, check: F) -> PayloadRule<T, F>
where
    F: Fn(&T) -> Result<(), String> + Send + Sync,
{
    PayloadRule {
        name: name.into(),
        check,
        _payload: PhantomData,
    }
}

impl<T: ?Sized, F> PayloadValidator<T> for PayloadRule<T, F>
where
    F: Fn(&T) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, payload: &T) -> Result<(), String> {
        (self.check)(payload)
    }
}

/// A closure-backed [`HeaderValidator`]. Built with [`header_rule`].
pub struct HeaderRule<F> {
    name: String,
    check: F,
}

/// Wrap a closure as a named header rule.
pub fn header_rule<F>(name: impl Into<String>, check: F) -> HeaderRule<F>
where
    F: Fn(&str, &HeaderValue) -> Result<(), String> + Send + Sync,
{
    HeaderRule {
        name: name.into(),
        check,
    }
}

impl<F> HeaderValidator for HeaderRule<F>
where
    F: Fn(&str, &HeaderValue) -> Result<(), String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, key: &str, value: &HeaderValue) -> Result<(), String> {
        (self.check)(key, value)
    }
}

/// Run a payload rule, recording a failure against `target` if it rejects.
pub(crate) fn run_payload_rule<T: ?Sized>(
    rule: &dyn PayloadValidator<T>,
    payload: &T,
    target: ValidationTarget,
    failures: &mut Vec<ValidationFailure>,
) {
    if let Err(reason) = rule.validate(payload) {
        failures.push(ValidationFailure::new(rule.name(), target, reason));
    }
}

/// Run a header rule, recording a failure against the header if it rejects.
pub(crate) fn run_header_rule(
    rule: &dyn HeaderValidator,
    key: &str,
    value: &HeaderValue,
    failures: &mut Vec<ValidationFailure>,
) {
    if let Err(reason) = rule.validate(key, value) {
        failures.push(ValidationFailure::new(
            rule.name(),
            ValidationTarget::Header(key.to_string()),
            reason,
        ));
    }
}

/// Outcome of a validation pass: every failure found, possibly none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    #[must_use]
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Whether the named rule is among the failures.
    #[must_use]
    pub fn has_failure(&self, rule: &str) -> bool {
        self.failures.iter().any(|f| f.rule == rule)
    }

    /// `Ok` if valid, otherwise one aggregated [`ValidationError::RulesFailed`].
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::RulesFailed {
                failures: self.failures,
            })
        }
    }
}

/// Built-in rule names.
pub mod rules {
    pub const PAYLOAD_REQUIRED: &str = "payload.required";
    pub const HEADER_KEY_NON_EMPTY: &str = "header.key.non_empty";
    pub const HEADER_VALUE_ENCODABLE: &str = "header.value.encodable";
    pub const SEAL_CONSISTENT: &str = "seal.consistent";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_rule_reports_name() {
        let rule = payload_rule("positive", |v: &i64| {
            if *v > 0 { Ok(()) } else { Err(format!("{v} is not positive")) }
        });
        let mut failures = Vec::new();
        run_payload_rule::<i64>(&rule, &-3, ValidationTarget::Payload, &mut failures);
        run_payload_rule::<i64>(&rule, &3, ValidationTarget::Payload, &mut failures);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule, "positive");
        assert!(failures[0].message.contains("-3"));
    }

    #[test]
    fn header_rule_targets_key() {
        let rule = header_rule("text-only", |_k: &str, v: &HeaderValue| {
            v.as_str().map(|_| ()).ok_or_else(|| "not text".to_string())
        });
        let mut failures = Vec::new();
        run_header_rule(&rule, "Retries", &HeaderValue::Integer(1), &mut failures);
        assert_eq!(
            failures[0].target,
            ValidationTarget::Header("Retries".to_string())
        );
    }

    #[test]
    fn empty_result_is_valid() {
        let result = ValidationResult::default();
        assert!(result.is_valid());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn into_result_aggregates() {
        let result = ValidationResult::from_failures(vec![
            ValidationFailure::new("a", ValidationTarget::Payload, "x"),
            ValidationFailure::new("b", ValidationTarget::Envelope, "y"),
        ]);
        assert!(result.has_failure("a"));
        let err = result.into_result().unwrap_err();
        assert_eq!(err.failures().len(), 2);
    }
}
