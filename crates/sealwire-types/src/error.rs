//! Error types for SealWire.
//!
//! All errors use the `SW_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Envelope state errors (sealing, signatures)
//! - 2xx: Validation rule errors (headers, payloads, batches)
//! - 5xx: Serialization pipeline errors (format, framing, crypto, cancellation)
//! - 9xx: General / configuration errors
//!
//! Every expected, data-dependent failure is returned as one of these
//! values. Panics are reserved for caller-contract violations.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How serious an error is, for log routing and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Expected and recoverable (e.g. a cancelled call).
    Warning,
    /// The operation failed; the caller should handle it.
    Error,
    /// Integrity is in question (bad signature, inconsistent seal state).
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Machine-checkable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Operation not allowed in the envelope's current seal state.
    EnvelopeState,
    /// Signature or seal-invariant failure.
    Integrity,
    /// One or more validation rules rejected the input.
    Validation,
    /// Data could not be converted to or from bytes.
    Serialization,
    /// The byte stream is structurally malformed.
    Framing,
    /// The encryption provider failed.
    Crypto,
    /// The caller cancelled the operation or its deadline passed.
    Cancellation,
    /// The pipeline is misconfigured (e.g. no formatter for a type).
    Configuration,
    /// Unexpected internal failure.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EnvelopeState => "ENVELOPE_STATE",
            Self::Integrity => "INTEGRITY",
            Self::Validation => "VALIDATION",
            Self::Serialization => "SERIALIZATION",
            Self::Framing => "FRAMING",
            Self::Crypto => "CRYPTO",
            Self::Cancellation => "CANCELLATION",
            Self::Configuration => "CONFIGURATION",
            Self::Internal => "INTERNAL",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// What a validation failure refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationTarget {
    /// The envelope as a whole (seal state, timestamps).
    Envelope,
    /// A single header, by key.
    Header(String),
    /// The payload.
    Payload,
    /// One item of a composite payload, by index.
    Item(usize),
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope => write!(f, "envelope"),
            Self::Header(key) => write!(f, "header '{key}'"),
            Self::Payload => write!(f, "payload"),
            Self::Item(index) => write!(f, "item #{index}"),
        }
    }
}

/// A single failed validation check.
///
/// `rule` names the check that failed so callers can tell failures apart
/// without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationFailure {
    /// Name of the rule that rejected the input.
    pub rule: String,
    /// What the rule was applied to.
    pub target: ValidationTarget,
    /// Human-readable reason.
    pub message: String,
}

impl ValidationFailure {
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        target: ValidationTarget,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            target,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.rule, self.target, self.message)
    }
}

fn summarize(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Envelope state and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // =================================================================
    // Envelope State Errors (1xx)
    // =================================================================
    /// `seal` or a mutation was attempted on a sealed envelope.
    #[error("SW_ERR_100: Envelope is already sealed")]
    AlreadySealed,

    /// The envelope has no payload to sign or validate.
    #[error("SW_ERR_101: Envelope has no payload")]
    MissingPayload,

    /// Signature verification was requested on an unsealed envelope.
    #[error("SW_ERR_102: Envelope is not sealed")]
    NotSealed,

    /// The verifier rejected the envelope's signature.
    #[error("SW_ERR_103: Signature verification failed")]
    SignatureMismatch,

    /// The signature generator could not produce a signature.
    #[error("SW_ERR_104: Signing failed: {reason}")]
    SigningFailed { reason: String },

    /// Seal fields are inconsistent (e.g. sealed without a signature).
    #[error("SW_ERR_105: Invalid seal state: {reason}")]
    InvalidSealState { reason: String },

    // =================================================================
    // Validation Rule Errors (2xx)
    // =================================================================
    /// A header was rejected.
    #[error("SW_ERR_200: Invalid header '{key}': {reason}")]
    InvalidHeader { key: String, reason: String },

    /// One or more rules failed; every failure found in the pass is listed.
    #[error(
        "SW_ERR_202: Validation failed: {} rule(s) violated: {}",
        .failures.len(),
        summarize(.failures)
    )]
    RulesFailed { failures: Vec<ValidationFailure> },

    /// An all-or-nothing batch operation had failing items.
    #[error(
        "SW_ERR_203: Batch failed: {failed} of {total} item(s) failed: {}",
        summarize(.failures)
    )]
    BatchFailed {
        failed: usize,
        total: usize,
        failures: Vec<ValidationFailure>,
    },
}

impl ValidationError {
    /// The `SW_ERR_` code of this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadySealed => "SW_ERR_100",
            Self::MissingPayload => "SW_ERR_101",
            Self::NotSealed => "SW_ERR_102",
            Self::SignatureMismatch => "SW_ERR_103",
            Self::SigningFailed { .. } => "SW_ERR_104",
            Self::InvalidSealState { .. } => "SW_ERR_105",
            Self::InvalidHeader { .. } => "SW_ERR_200",
            Self::RulesFailed { .. } => "SW_ERR_202",
            Self::BatchFailed { .. } => "SW_ERR_203",
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadySealed | Self::MissingPayload | Self::NotSealed => {
                ErrorCategory::EnvelopeState
            }
            Self::SignatureMismatch | Self::SigningFailed { .. } | Self::InvalidSealState { .. } => {
                ErrorCategory::Integrity
            }
            Self::InvalidHeader { .. }
            | Self::RulesFailed { .. }
            | Self::BatchFailed { .. } => ErrorCategory::Validation,
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::SignatureMismatch | Self::InvalidSealState { .. } => Severity::Critical,
            _ => Severity::Error,
        }
    }

    /// The individual failures carried by an aggregate error.
    ///
    /// Returns an empty slice for single-cause variants.
    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            Self::RulesFailed { failures } | Self::BatchFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization errors
// ---------------------------------------------------------------------------

/// The pipeline operation during which a serialization error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Serialize,
    Deserialize,
    Encode,
    Decode,
    Encrypt,
    Decrypt,
    Compress,
    Decompress,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Serialize => "Serialize",
            Self::Deserialize => "Deserialize",
            Self::Encode => "Encode",
            Self::Decode => "Decode",
            Self::Encrypt => "Encrypt",
            Self::Decrypt => "Decrypt",
            Self::Compress => "Compress",
            Self::Decompress => "Decompress",
        };
        f.write_str(name)
    }
}

/// Machine-checkable kind of a [`SerializationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerializationErrorKind {
    /// The data does not match the expected format.
    Format,
    /// No formatter/resolver is registered for the target type.
    /// A configuration problem, not a data problem.
    FormatterMissing,
    /// The frame flag byte is missing or unrecognized.
    InvalidFrame,
    /// The encryption provider failed.
    Crypto,
    /// The compression stage failed.
    Compression,
    /// The caller cancelled the operation.
    Cancelled,
    /// The operation's deadline passed.
    TimedOut,
    /// Unexpected internal failure (e.g. a worker task panicked).
    Internal,
}

impl SerializationErrorKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Format => "SW_ERR_500",
            Self::FormatterMissing => "SW_ERR_501",
            Self::InvalidFrame => "SW_ERR_502",
            Self::Crypto => "SW_ERR_503",
            Self::Compression => "SW_ERR_504",
            Self::Cancelled => "SW_ERR_505",
            Self::TimedOut => "SW_ERR_506",
            Self::Internal => "SW_ERR_507",
        }
    }

    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::Format | Self::Compression => ErrorCategory::Serialization,
            Self::FormatterMissing => ErrorCategory::Configuration,
            Self::InvalidFrame => ErrorCategory::Framing,
            Self::Crypto => ErrorCategory::Crypto,
            Self::Cancelled | Self::TimedOut => ErrorCategory::Cancellation,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Cancelled | Self::TimedOut => Severity::Warning,
            Self::Internal => Severity::Critical,
            _ => Severity::Error,
        }
    }
}

fn target_suffix(target: Option<&str>) -> String {
    target.map(|t| format!(" for {t}")).unwrap_or_default()
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure in the serialization pipeline, tagged with the operation that
/// failed and, when known, the target type.
#[derive(Debug, Error)]
#[error(
    "{}: {operation} failed{}: {message}",
    .kind.code(),
    target_suffix(.target_type.as_deref())
)]
pub struct SerializationError {
    kind: SerializationErrorKind,
    operation: Operation,
    target_type: Option<String>,
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl SerializationError {
    #[must_use]
    pub fn new(kind: SerializationErrorKind, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            kind,
            operation,
            target_type: None,
            message: message.into(),
            source: None,
        }
    }

    /// Data-shape failure.
    #[must_use]
    pub fn format(operation: Operation, message: impl Into<String>) -> Self {
        Self::new(SerializationErrorKind::Format, operation, message)
    }

    /// No formatter is registered for `type_name`.
    #[must_use]
    pub fn formatter_missing(operation: Operation, type_name: &str) -> Self {
        Self::new(
            SerializationErrorKind::FormatterMissing,
            operation,
            "no formatter registered for type",
        )
        .with_target_name(type_name)
    }

    /// Malformed frame on the read path.
    #[must_use]
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::new(
            SerializationErrorKind::InvalidFrame,
            Operation::Deserialize,
            message,
        )
    }

    /// Wraps an encryption provider failure; the provider error is kept as
    /// the source.
    #[must_use]
    pub fn crypto<E>(operation: Operation, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(SerializationErrorKind::Crypto, operation, err.to_string()).with_source(err)
    }

    #[must_use]
    pub fn cancelled(operation: Operation) -> Self {
        Self::new(
            SerializationErrorKind::Cancelled,
            operation,
            "operation was cancelled",
        )
    }

    #[must_use]
    pub fn timed_out(operation: Operation) -> Self {
        Self::new(
            SerializationErrorKind::TimedOut,
            operation,
            "operation deadline elapsed",
        )
    }

    #[must_use]
    pub fn internal(operation: Operation, message: impl Into<String>) -> Self {
        Self::new(SerializationErrorKind::Internal, operation, message)
    }

    /// Tag the error with the Rust type it concerns.
    #[must_use]
    pub fn with_target<T: ?Sized>(self) -> Self {
        self.with_target_name(std::any::type_name::<T>())
    }

    #[must_use]
    pub fn with_target_name(mut self, type_name: &str) -> Self {
        self.target_type = Some(type_name.to_string());
        self
    }

    #[must_use]
    pub fn with_source<E>(mut self, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(err));
        self
    }

    #[must_use]
    pub fn kind(&self) -> SerializationErrorKind {
        self.kind
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn target_type(&self) -> Option<&str> {
        self.target_type.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// `true` for cancellation and deadline outcomes.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self.kind,
            SerializationErrorKind::Cancelled | SerializationErrorKind::TimedOut
        )
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Central error enum where both error families meet.
#[derive(Debug, Error)]
pub enum SealwireError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Configuration error (invalid config document, bad values).
    #[error("SW_ERR_900: Configuration error: {0}")]
    Configuration(String),
}

impl SealwireError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Serialization(e) => e.code(),
            Self::Configuration(_) => "SW_ERR_900",
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(e) => e.category(),
            Self::Serialization(e) => e.category(),
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Validation(e) => e.severity(),
            Self::Serialization(e) => e.severity(),
            Self::Configuration(_) => Severity::Error,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SealwireError>;
