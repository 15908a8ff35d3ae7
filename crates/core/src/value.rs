//! Value types for entity members
//!
//! This module defines:
//! - Value: Unified enum for every member value an entity or complex type can hold
//!
//! ## Value Model
//!
//! Eight data variants mirror a JSON-like model:
//! - Null, Bool, Int, Float, String, Bytes, Array, Object
//!
//! `Object` carries instances of complex types (structured values without
//! identity). Two more variants carry association values:
//! - `Entity`: a singleton association (one referenced entity)
//! - `EntitySet`: a collection association (many referenced entities)
//!
//! ### Type Rules
//!
//! - Different variants are NEVER equal (`Int(1) != Float(1.0)`)
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Association variants compare by reference identity, never by content
//! - Association variants are not part of the wire form; entities serialize
//!   only their data members. Serializing a value that holds an association
//!   anywhere (directly, in an `Array`, or in an `Object`) fails with an error
//!   naming the problem; send entry ids instead.

use crate::entity::{Entity, EntityLink};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Member value of an entity or complex type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Array of values
    Array(Vec<Value>),
    /// Complex type instance with named members
    Object(BTreeMap<String, Value>),
    /// Singleton association
    #[serde(serialize_with = "reject_association", skip_deserializing)]
    Entity(EntityLink),
    /// Collection association
    #[serde(serialize_with = "reject_association", skip_deserializing)]
    EntitySet(Vec<EntityLink>),
}

fn reject_association<T, S: Serializer>(_links: &T, _serializer: S) -> Result<S::Ok, S::Error> {
    Err(S::Error::custom(
        "association values cannot be serialized; reference entities by entry id",
    ))
}

// Custom PartialEq implementation for IEEE-754 float semantics and
// identity comparison of associations
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => a == b,
            (Value::EntitySet(a), Value::EntitySet(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Singleton association value pointing at `entity`
    pub fn entity(entity: &Entity) -> Self {
        Value::Entity(entity.link())
    }

    /// Collection association value holding `entities` in order
    pub fn entity_set<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        Value::EntitySet(entities.into_iter().map(Entity::link).collect())
    }

    /// Empty collection association value
    pub fn empty_set() -> Self {
        Value::EntitySet(Vec::new())
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Entity(_) => "Entity",
            Value::EntitySet(_) => "EntitySet",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an association (entity or entity set)
    pub fn is_association(&self) -> bool {
        matches!(self, Value::Entity(_) | Value::EntitySet(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric view of Int and Float values
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as &[Value] if this is an Array value
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get the member map if this is an Object value
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Resolve a singleton association
    ///
    /// Returns `None` for other variants and for links whose target was dropped.
    pub fn as_entity(&self) -> Option<Entity> {
        match self {
            Value::Entity(link) => link.upgrade(),
            _ => None,
        }
    }

    /// Resolve a collection association to its live members
    pub fn as_entities(&self) -> Option<Vec<Entity>> {
        match self {
            Value::EntitySet(links) => Some(links.iter().filter_map(EntityLink::upgrade).collect()),
            _ => None,
        }
    }

    /// Check whether this collection association already holds `entity`
    pub fn set_contains(&self, entity: &Entity) -> bool {
        match self {
            Value::EntitySet(links) => links.iter().any(|l| l.points_to(entity)),
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(o: BTreeMap<String, Value>) -> Self {
        Value::Object(o)
    }
}

impl From<&Entity> for Value {
    fn from(e: &Entity) -> Self {
        Value::entity(e)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
