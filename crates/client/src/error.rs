//! Operation errors
//!
//! An [`OperationError`] is what a failed operation reports through its
//! `Error` property. Producers return it for anything that went wrong on the
//! other end of the round trip. Panics are never converted into one.
//!
//! | Kind | Meaning |
//! |------|---------|
//! | `Service` | The service reported a failure |
//! | `Unauthorized` | The caller is not allowed to run the operation |
//! | `Transport` | The request did not reach the service or the reply was lost |
//! | `Runtime` | The operation could not be scheduled |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an operation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationErrorKind {
    /// The service reported a failure
    Service,
    /// The caller is not allowed to run the operation
    Unauthorized,
    /// The round trip failed
    Transport,
    /// No runtime was available to drive the operation
    Runtime,
}

impl fmt::Display for OperationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationErrorKind::Service => "service",
            OperationErrorKind::Unauthorized => "unauthorized",
            OperationErrorKind::Transport => "transport",
            OperationErrorKind::Runtime => "runtime",
        };
        f.write_str(name)
    }
}

/// Failure of an asynchronous operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct OperationError {
    /// Category
    pub kind: OperationErrorKind,
    /// Description
    pub message: String,
}

impl OperationError {
    /// Error of `kind`
    pub fn new(kind: OperationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure reported by the service
    pub fn service(message: impl Into<String>) -> Self {
        Self::new(OperationErrorKind::Service, message)
    }

    /// Access denied
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(OperationErrorKind::Unauthorized, message)
    }

    /// Round-trip failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(OperationErrorKind::Transport, message)
    }

    /// Scheduling failure
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(OperationErrorKind::Runtime, message)
    }
}
