//! Error taxonomy for the HNC core.
//!
//! Grounded on `spark-core::error`'s `CoreError`/`ErrorCategory` split: a
//! stable-coded error carries a machine-readable category that downstream
//! code (the reconcile framework's retry policy, admission response
//! mapping) switches on instead of matching strings. `spec.md` §7 draws the
//! same line: transient store errors retry, structural problems are never
//! errors (they become `Condition`s — see `crate::model::Condition`),
//! admission denials carry a machine-readable `AdmissionReason`, and
//! propagation conflicts are emitted as events rather than returned.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The stable, machine-readable classification of an [`HncError`]. Mirrors
/// `spark-core::error::ErrorCategory`, trimmed to the distinctions this
/// crate's reconcile framework actually branches on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A store read/write failed for a reason expected to clear up on its
    /// own (network blip, conflict, server busy). The reconcile framework
    /// retries with exponential backoff, capped at 10s per attempt for
    /// object propagation (`spec.md` §7).
    Transient,
    /// The request can never succeed as given; retrying is pointless.
    NonRetryable,
}

/// Errors raised by the HNC core itself. Structural tree problems are
/// deliberately *not* representable here — see the module doc — so every
/// variant below corresponds to a real failure of an I/O-shaped operation.
#[derive(Debug, Error)]
pub enum HncError {
    #[error("store operation failed for {resource}: {message}")]
    Store { resource: String, message: String, #[source] source: Option<Arc<dyn std::error::Error + Send + Sync>> },

    #[error("namespace {namespace} not found")]
    NotFound { namespace: String },

    #[error("selector annotation on {namespace}/{name} could not be parsed: {message}")]
    SelectorParse { namespace: String, name: String, message: String },

    #[error("internal invariant violated: {message}")]
    Internal { message: String },
}

impl HncError {
    pub fn store(resource: impl Into<String>, message: impl Into<String>) -> Self {
        HncError::Store { resource: resource.into(), message: message.into(), source: None }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            HncError::Store { .. } => ErrorCategory::Transient,
            HncError::NotFound { .. } => ErrorCategory::Transient,
            HncError::SelectorParse { .. } => ErrorCategory::NonRetryable,
            HncError::Internal { .. } => ErrorCategory::NonRetryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transient)
    }
}

pub type Result<T, E = HncError> = std::result::Result<T, E>;

/// Machine-readable admission-denial reason, matching `spec.md` §7's
/// enumerated list (`Forbidden`, `Conflict`, `Invalid`, `BadRequest`,
/// `Unauthorized`, `ServiceUnavailable`, `InternalError`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdmissionReason {
    Forbidden,
    Conflict,
    Invalid,
    BadRequest,
    Unauthorized,
    ServiceUnavailable,
    InternalError,
}

/// The outcome of an admission check: either approval (optionally carrying
/// warnings) or a structured denial.
#[derive(Clone, Debug)]
pub enum Admission {
    Allow,
    AllowWithWarnings(Vec<String>),
    Deny { reason: AdmissionReason, message: String },
}

impl Admission {
    pub fn deny(reason: AdmissionReason, message: impl Into<String>) -> Self {
        Admission::Deny { reason, message: message.into() }
    }

    pub fn is_allowed(&self) -> bool {
        !matches!(self, Admission::Deny { .. })
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Admission::Allow => write!(f, "allow"),
            Admission::AllowWithWarnings(warnings) => write!(f, "allow ({} warnings)", warnings.len()),
            Admission::Deny { reason, message } => write!(f, "deny[{reason:?}]: {message}"),
        }
    }
}
