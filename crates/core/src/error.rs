//! Error types for the RIA core
//!
//! This module defines the error type shared by every crate in the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Only structural and configuration failures are errors. Business and
//! validation failures travel as data on the change-set entries and never
//! surface here.

use thiserror::Error;

/// Result type alias for RIA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the RIA core
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Model | `InvalidOperation`, `UnknownType`, `UnknownMember`, `InvalidSchema` | Metadata/model mismatch |
/// | Batch | `InvalidChangeSet` | Malformed submitted batch |
/// | Dispatch | `OperationNotFound`, `Unauthorized`, `Domain` | Domain service dispatch |
/// | System | `Config`, `Serialization`, `Io` | Infrastructure |
#[derive(Debug, Error)]
pub enum Error {
    /// Operation cannot run in the current state, or the model does not allow it
    #[error("invalid operation: {reason}")]
    InvalidOperation {
        /// What was attempted and why it is invalid
        reason: String,
    },

    /// The submitted change set is structurally invalid
    #[error("invalid change set: {reason}")]
    InvalidChangeSet {
        /// Which rule the batch breaks
        reason: String,
    },

    /// No metadata is registered for the type
    #[error("unknown type: {type_name}")]
    UnknownType {
        /// Name of the type that was looked up
        type_name: String,
    },

    /// The type has no member with this name
    #[error("unknown member '{member}' on type {type_name}")]
    UnknownMember {
        /// Declaring type
        type_name: String,
        /// Member that was looked up
        member: String,
    },

    /// A type descriptor was rejected at registration
    #[error("invalid schema for {type_name}: {reason}")]
    InvalidSchema {
        /// Type being registered
        type_name: String,
        /// What is wrong with it
        reason: String,
    },

    /// The domain service exposes no operation for the request
    #[error("operation not found: {operation}")]
    OperationNotFound {
        /// Description of the missing operation
        operation: String,
    },

    /// An authorization rule denied the operation
    #[error("access to operation '{operation}' was denied: {reason}")]
    Unauthorized {
        /// Operation name
        operation: String,
        /// Message from the denying rule
        reason: String,
    },

    /// Domain logic failed in a way that aborts the submit
    #[error("domain operation '{operation}' failed: {reason}")]
    Domain {
        /// Operation name
        operation: String,
        /// Failure reported by the domain logic
        reason: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {reason}")]
    Config {
        /// What went wrong
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {reason}")]
    Serialization {
        /// Underlying serializer message
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an [`Error::InvalidOperation`]
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Error::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Create an [`Error::InvalidChangeSet`]
    pub fn invalid_change_set(reason: impl Into<String>) -> Self {
        Error::InvalidChangeSet {
            reason: reason.into(),
        }
    }

    /// Create an [`Error::UnknownType`]
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Error::UnknownType {
            type_name: type_name.into(),
        }
    }

    /// Create an [`Error::UnknownMember`]
    pub fn unknown_member(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Error::UnknownMember {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    /// Create an [`Error::InvalidSchema`]
    pub fn invalid_schema(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidSchema {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an [`Error::OperationNotFound`]
    pub fn operation_not_found(operation: impl Into<String>) -> Self {
        Error::OperationNotFound {
            operation: operation.into(),
        }
    }

    /// Create an [`Error::Unauthorized`]
    pub fn unauthorized(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Unauthorized {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an [`Error::Domain`]
    pub fn domain(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Domain {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an [`Error::Config`]
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Create an [`Error::Serialization`]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Error::Serialization {
            reason: reason.into(),
        }
    }

    /// True for errors caused by a static model/metadata mismatch
    ///
    /// These are never worth retrying.
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidOperation { .. }
                | Error::UnknownType { .. }
                | Error::UnknownMember { .. }
                | Error::InvalidSchema { .. }
        )
    }
}
