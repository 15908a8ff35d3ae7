//! Core types for the RIA change-set core
//!
//! This crate defines the foundational types used throughout the workspace:
//! - TypeName: Registered name of an entity or complex type
//! - DomainOperation: Operation kinds (insert/update/delete/custom/...)
//! - Value: Unified member value enum, including association values
//! - Entity: Shared, identity-bearing handle to an entity instance
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod error;
pub mod types;
pub mod value;

pub use entity::{Entity, EntityLink, PropertyChangedHandler, TYPE_KEY};
pub use error::{Error, Result};
pub use types::{DomainOperation, TypeName};
pub use value::Value;
