//! Universal result envelope returned by every repository operation.
//!
//! # Invariants
//! - `succeeded == true` implies `error` is absent.
//! - `succeeded == false` implies `error` is present and `data` is empty,
//!   except count-style operations which report `Some(0)`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Predicate or lookup matched nothing (or matched ambiguously).
    NotFound,
    /// A sort or patch named a property the entity does not declare, or the
    /// value could not be assigned to it.
    FieldResolutionFailure,
    /// The store rejected a write, a write touched no rows, or the store
    /// raised a fault.
    PersistenceFailure,
    /// An existence probe faulted.
    ExistsCheckFailure,
}

/// Caller-facing error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// `{ succeeded, data, error }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub succeeded: bool,
    pub data: Option<T>,
    pub error: Option<ErrorInfo>,
}

impl<T> Outcome<T> {
    pub fn success(data: T) -> Self {
        Self {
            succeeded: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success without a payload, e.g. removing a record that was not there.
    pub fn vacuous() -> Self {
        Self {
            succeeded: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(error: ErrorInfo) -> Self {
        Self {
            succeeded: false,
            data: None,
            error: Some(error),
        }
    }

    /// Failure that still carries a placeholder payload (count-style results).
    pub fn failure_with(data: T, error: ErrorInfo) -> Self {
        Self {
            succeeded: false,
            data: Some(data),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.succeeded
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|error| error.kind)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            succeeded: self.succeeded,
            data: self.data.map(f),
            error: self.error,
        }
    }

    /// Gives a failure the placeholder payload count-style operations report.
    pub fn with_placeholder(mut self, placeholder: T) -> Self {
        if !self.succeeded && self.data.is_none() {
            self.data = Some(placeholder);
        }
        self
    }

    /// Re-types a failure, dropping any payload.
    pub fn into_failure<U>(self) -> Outcome<U> {
        Outcome {
            succeeded: false,
            data: None,
            error: self.error,
        }
    }

    /// Converts into a `Result`, dropping the placeholder payload of failures.
    pub fn into_result(self) -> Result<Option<T>, ErrorInfo> {
        match self.error {
            Some(error) if !self.succeeded => Err(error),
            _ => Ok(self.data),
        }
    }
}

impl<T> Outcome<Option<T>> {
    /// `Some(None)` data collapses into an absent payload.
    pub fn flatten(self) -> Outcome<T> {
        Outcome {
            succeeded: self.succeeded,
            data: self.data.flatten(),
            error: self.error,
        }
    }
}
