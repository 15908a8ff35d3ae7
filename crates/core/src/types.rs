//! Core types for the RIA core
//!
//! This module defines the foundational types:
//! - TypeName: Registered name of an entity or complex type
//! - DomainOperation: Kind of operation a domain service exposes or a change-set entry requests

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Registered name of an entity or complex type
///
/// Type names are the identity of a type in the declarative schema. They
/// play the role a runtime type plays in a reflective system: metadata,
/// operation lookup and change-set grouping are all keyed by `TypeName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Create a type name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TypeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Kind of a domain operation
///
/// Change-set entries use `None`, `Insert`, `Update` and `Delete`.
/// `None` marks an entity that is only part of the batch because another
/// entry references it. `Query`, `Invoke` and `Custom` describe operations
/// exposed by a domain service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainOperation {
    /// Entity is unchanged
    None,
    /// Query returning entities
    Query,
    /// Insert a new entity
    Insert,
    /// Update an existing entity
    Update,
    /// Delete an existing entity
    Delete,
    /// Service-level invoke operation
    Invoke,
    /// Custom entity action
    Custom,
}

impl DomainOperation {
    /// Name used in messages and authorization contexts
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainOperation::None => "None",
            DomainOperation::Query => "Query",
            DomainOperation::Insert => "Insert",
            DomainOperation::Update => "Update",
            DomainOperation::Delete => "Delete",
            DomainOperation::Invoke => "Invoke",
            DomainOperation::Custom => "Custom",
        }
    }

    /// True for insert, update and delete
    pub fn is_cud(&self) -> bool {
        matches!(
            self,
            DomainOperation::Insert | DomainOperation::Update | DomainOperation::Delete
        )
    }

    /// True for operations a change-set entry may carry
    pub fn is_change_set_operation(&self) -> bool {
        matches!(self, DomainOperation::None) || self.is_cud()
    }
}

impl fmt::Display for DomainOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
