//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. Rejected operations never leave a
//! half-applied transition behind: the caller can inspect the error kind and
//! retry against unchanged state.

use std::fmt;

use thiserror::Error;

use crate::evaluator::EvaluationError;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Structural authoring problems detected while navigating or analysing a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthoringErrorKind {
    /// A branch rule targets its own source.
    RecursiveBranching,
    /// A branch rule targets something that comes before its source.
    BackwardBranching,
    /// A branch or precondition names an identifier the route does not know.
    UnknownTarget,
    /// A branch target exists but may not be reached from the current position.
    InvalidTarget,
}

impl fmt::Display for AuthoringErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthoringErrorKind::RecursiveBranching => "RECURSIVE_BRANCHING",
            AuthoringErrorKind::BackwardBranching => "BACKWARD_BRANCHING",
            AuthoringErrorKind::UnknownTarget => "UNKNOWN_TARGET",
            AuthoringErrorKind::InvalidTarget => "INVALID_TARGET",
        };
        f.write_str(name)
    }
}

/// Reasons an attempt (begin or end) is refused by an item session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptErrorKind {
    DurationOverflow,
    DurationUnderflow,
    AttemptsOverflow,
    SkippingForbidden,
    InvalidResponse,
}

impl fmt::Display for AttemptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptErrorKind::DurationOverflow => "DURATION_OVERFLOW",
            AttemptErrorKind::DurationUnderflow => "DURATION_UNDERFLOW",
            AttemptErrorKind::AttemptsOverflow => "ATTEMPTS_OVERFLOW",
            AttemptErrorKind::SkippingForbidden => "SKIPPING_FORBIDDEN",
            AttemptErrorKind::InvalidResponse => "INVALID_RESPONSE",
        };
        f.write_str(name)
    }
}

/// Main error enum for the delivery engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Route topology or branch target problems.
    #[error("authoring error ({kind}): {message}")]
    Authoring {
        kind: AuthoringErrorKind,
        message: String,
    },

    /// An operation was called from a state that does not allow it.
    #[error("state violation: {0}")]
    StateViolation(String),

    /// An attempt was refused; built-in counters are untouched.
    #[error("attempt rejected ({kind}): {message}")]
    AttemptRejected {
        kind: AttemptErrorKind,
        message: String,
    },

    /// The rule evaluator failed.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// A selection rule cannot be satisfied by the section's children.
    #[error("selection error: {0}")]
    Selection(String),

    /// Unknown variable, route position or store key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Values that do not match their declaration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Convenience constructors
impl Error {
    pub fn authoring(kind: AuthoringErrorKind, msg: impl Into<String>) -> Self {
        Self::Authoring {
            kind,
            message: msg.into(),
        }
    }

    pub fn attempt_rejected(kind: AttemptErrorKind, msg: impl Into<String>) -> Self {
        Self::AttemptRejected {
            kind,
            message: msg.into(),
        }
    }

    pub fn state_violation(msg: impl Into<String>) -> Self {
        Self::StateViolation(msg.into())
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl Error {
    /// Attempt rejection kind, if this is an attempt rejection.
    pub fn attempt_kind(&self) -> Option<AttemptErrorKind> {
        match self {
            Error::AttemptRejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Authoring error kind, if this is an authoring error.
    pub fn authoring_kind(&self) -> Option<AuthoringErrorKind> {
        match self {
            Error::Authoring { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_attempt_rejected(&self) -> bool {
        matches!(self, Error::AttemptRejected { .. })
    }

    pub fn is_state_violation(&self) -> bool {
        matches!(self, Error::StateViolation(_))
    }
}
