//! Metadata providers
//!
//! A [`MetadataProvider`] answers which types exist and how they are
//! declared. [`SchemaRegistry`] is the in-memory provider filled once at
//! startup from [`TypeDescriptor`]s.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let schema = SchemaRegistry::build([
//!     TypeDescriptor::entity("Customer").member(MemberDescriptor::int("Id").key()),
//!     TypeDescriptor::complex("Address").member(MemberDescriptor::string("Street")),
//! ])?;
//!
//! assert!(schema.is_entity_type(&"Customer".into()));
//! ```

use crate::descriptor::{MemberShape, TypeDescriptor, TypeKind};
use ria_core::{Error, Result, TypeName};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Source of type declarations
pub trait MetadataProvider: Send + Sync {
    /// Declaration of `type_name`, if registered
    fn describe(&self, type_name: &TypeName) -> Option<Arc<TypeDescriptor>>;

    /// Whether `type_name` is a registered entity type
    fn is_entity_type(&self, type_name: &TypeName) -> bool {
        self.describe(type_name)
            .map_or(false, |d| d.kind() == TypeKind::Entity)
    }

    /// Whether `type_name` is a registered complex type
    fn is_complex_type(&self, type_name: &TypeName) -> bool {
        self.describe(type_name)
            .map_or(false, |d| d.kind() == TypeKind::Complex)
    }
}

/// Registry of type declarations
///
/// Registration checks each descriptor on its own; [`SchemaRegistry::validate`]
/// checks cross-type references once every type is registered.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<TypeName, Arc<TypeDescriptor>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every descriptor and validate the resulting schema
    pub fn build(descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Register a type
    ///
    /// Rejects duplicate type names, duplicate member names, entity types
    /// without key members, complex types with keys or associations, and
    /// entity-valued members without an association.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<()> {
        let name = descriptor.name().clone();
        if self.types.contains_key(&name) {
            return Err(Error::invalid_schema(name.as_str(), "type is already registered"));
        }

        let mut seen = BTreeSet::new();
        for member in descriptor.members() {
            if !seen.insert(member.name()) {
                return Err(Error::invalid_schema(
                    name.as_str(),
                    format!("duplicate member '{}'", member.name()),
                ));
            }
            if member.shape().is_entity() && member.association.is_none() {
                return Err(Error::invalid_schema(
                    name.as_str(),
                    format!("entity-valued member '{}' has no association", member.name()),
                ));
            }
        }

        match descriptor.kind() {
            TypeKind::Entity => {
                if !descriptor.members().iter().any(|m| m.key) {
                    return Err(Error::invalid_schema(name.as_str(), "entity type has no key members"));
                }
            }
            TypeKind::Complex => {
                if let Some(m) = descriptor
                    .members()
                    .iter()
                    .find(|m| m.key || m.association.is_some())
                {
                    return Err(Error::invalid_schema(
                        name.as_str(),
                        format!("complex type member '{}' cannot be a key or association", m.name()),
                    ));
                }
            }
        }

        self.types.insert(name, Arc::new(descriptor));
        Ok(())
    }

    /// Check that every referenced type is registered with the expected kind
    pub fn validate(&self) -> Result<()> {
        for descriptor in self.types.values() {
            for member in descriptor.members() {
                let (target, expected) = match member.shape() {
                    MemberShape::Complex(t) | MemberShape::ComplexCollection(t) => (t, TypeKind::Complex),
                    MemberShape::Entity(t) | MemberShape::EntityCollection(t) => (t, TypeKind::Entity),
                    _ => continue,
                };
                // External references point at types served elsewhere
                if member.external_reference {
                    continue;
                }
                match self.types.get(target) {
                    Some(d) if d.kind() == expected => {}
                    Some(_) => {
                        return Err(Error::invalid_schema(
                            descriptor.name().as_str(),
                            format!("member '{}' refers to {} with the wrong kind", member.name(), target),
                        ))
                    }
                    None => {
                        return Err(Error::invalid_schema(
                            descriptor.name().as_str(),
                            format!("member '{}' refers to unregistered type {}", member.name(), target),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    /// Registered type names in order
    pub fn type_names(&self) -> impl Iterator<Item = &TypeName> {
        self.types.keys()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl MetadataProvider for SchemaRegistry {
    fn describe(&self, type_name: &TypeName) -> Option<Arc<TypeDescriptor>> {
        self.types.get(type_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AssociationDescriptor, MemberDescriptor};

    fn customer() -> TypeDescriptor {
        TypeDescriptor::entity("Customer")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::complex("Address", "Address"))
    }

    fn address() -> TypeDescriptor {
        TypeDescriptor::complex("Address").member(MemberDescriptor::string("Street"))
    }

    #[test]
    fn test_build_and_classify() {
        let schema = SchemaRegistry::build([customer(), address()]).unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.is_entity_type(&"Customer".into()));
        assert!(schema.is_complex_type(&"Address".into()));
        assert!(!schema.is_entity_type(&"Address".into()));
        assert!(schema.describe(&"Nope".into()).is_none());
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut schema = SchemaRegistry::new();
        schema.register(address()).unwrap();
        let err = schema.register(address()).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let t = TypeDescriptor::complex("Address")
            .member(MemberDescriptor::string("Street"))
            .member(MemberDescriptor::string("Street"));
        assert!(SchemaRegistry::new().register(t).is_err());
    }

    #[test]
    fn test_entity_without_key_rejected() {
        let t = TypeDescriptor::entity("Order").member(MemberDescriptor::int("Id"));
        let err = SchemaRegistry::new().register(t).unwrap_err();
        assert!(err.to_string().contains("no key members"));
    }

    #[test]
    fn test_complex_with_key_rejected() {
        let t = TypeDescriptor::complex("Address").member(MemberDescriptor::int("Id").key());
        assert!(SchemaRegistry::new().register(t).is_err());
    }

    #[test]
    fn test_entity_member_without_association_rejected() {
        let t = TypeDescriptor::entity("Order")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::new("Customer", MemberShape::Entity("Customer".into())));
        assert!(SchemaRegistry::new().register(t).is_err());
    }

    #[test]
    fn test_unregistered_reference_rejected() {
        let err = SchemaRegistry::build([customer()]).unwrap_err();
        assert!(err.to_string().contains("unregistered type Address"));
    }

    #[test]
    fn test_wrong_kind_reference_rejected() {
        let order = TypeDescriptor::entity("Order")
            .member(MemberDescriptor::int("Id").key())
            .member(MemberDescriptor::entity_ref(
                "Customer",
                "Address",
                AssociationDescriptor::new("Order_Customer", &["CustomerId"], &["Id"]),
            ));
        let err = SchemaRegistry::build([order, address()]).unwrap_err();
        assert!(err.to_string().contains("wrong kind"));
    }

    #[test]
    fn test_external_reference_not_checked() {
        let order = TypeDescriptor::entity("Order")
            .member(MemberDescriptor::int("Id").key())
            .member(
                MemberDescriptor::entity_ref(
                    "Product",
                    "Product",
                    AssociationDescriptor::new("Order_Product", &["ProductId"], &["Id"]),
                )
                .external_reference(),
            );
        assert!(SchemaRegistry::build([order]).is_ok());
    }
}
