//! Per-member metadata
//!
//! A [`MetaMember`] classifies one declared member of a type. The
//! classification is fixed when the owning [`MetaType`](crate::MetaType) is
//! built; only the accessor pair is created lazily, on first use.

use crate::descriptor::{AssociationDescriptor, MemberDescriptor, MemberShape};
use crate::rules::ValidationRule;
use once_cell::sync::OnceCell;
use ria_core::{Entity, TypeName, Value};
use std::fmt;
use std::sync::Arc;

type Getter = Arc<dyn Fn(&Entity) -> Option<Value> + Send + Sync>;
type Setter = Arc<dyn Fn(&Entity, Value) -> bool + Send + Sync>;

/// Cached get/set delegates for one member
#[derive(Clone)]
pub struct MemberAccessor {
    getter: Getter,
    setter: Setter,
}

impl MemberAccessor {
    fn build(name: &str, has_getter: bool) -> Self {
        let key: Arc<str> = Arc::from(name);
        let getter: Getter = if has_getter {
            let key = key.clone();
            Arc::new(move |entity: &Entity| entity.get(&key))
        } else {
            Arc::new(|_: &Entity| None)
        };
        let setter: Setter = Arc::new(move |entity: &Entity, value: Value| entity.set_if_changed(&key, value));
        Self { getter, setter }
    }

    /// Read the member, `None` if absent or unreadable
    pub fn get(&self, entity: &Entity) -> Option<Value> {
        (self.getter)(entity)
    }

    /// Write the member if the value differs; returns whether it was written
    pub fn set(&self, entity: &Entity, value: Value) -> bool {
        (self.setter)(entity, value)
    }
}

/// Classified metadata of one member
pub struct MetaMember {
    name: String,
    declaring_type: TypeName,
    shape: MemberShape,
    association: Option<AssociationDescriptor>,
    rules: Vec<ValidationRule>,
    is_data_member: bool,
    is_key_member: bool,
    is_composition: bool,
    is_external_reference: bool,
    is_include: bool,
    is_roundtrip_member: bool,
    is_concurrency_check: bool,
    is_timestamp: bool,
    is_mergeable: bool,
    has_getter: bool,
    requires_validation: bool,
    accessor: OnceCell<MemberAccessor>,
}

impl MetaMember {
    /// Classify `descriptor`
    ///
    /// `type_roundtrip` is the declaring type's round-trip marker;
    /// `complex_requires_validation` tells whether the member's complex type
    /// (if any) needs validation.
    pub(crate) fn new(
        declaring_type: &TypeName,
        descriptor: &MemberDescriptor,
        type_roundtrip: bool,
        complex_requires_validation: bool,
    ) -> Self {
        let is_association = descriptor.association.is_some();
        let is_data_member = descriptor.has_getter && !descriptor.exclude && !is_association;
        let is_roundtrip_member = is_data_member
            && (type_roundtrip
                || descriptor.roundtrip_original
                || descriptor.concurrency_check
                || descriptor.timestamp);
        let requires_validation = descriptor.has_getter
            && (!descriptor.rules.is_empty()
                || (descriptor.shape.is_complex() && complex_requires_validation));

        Self {
            name: descriptor.name.clone(),
            declaring_type: declaring_type.clone(),
            shape: descriptor.shape.clone(),
            association: descriptor.association.clone(),
            rules: descriptor.rules.clone(),
            is_data_member,
            is_key_member: descriptor.key,
            is_composition: descriptor.composition,
            is_external_reference: descriptor.external_reference,
            is_include: descriptor.include,
            is_roundtrip_member,
            is_concurrency_check: descriptor.concurrency_check,
            is_timestamp: descriptor.timestamp,
            is_mergeable: is_data_member && !descriptor.merge_excluded,
            has_getter: descriptor.has_getter,
            requires_validation,
            accessor: OnceCell::new(),
        }
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type declaring this member
    pub fn declaring_type(&self) -> &TypeName {
        &self.declaring_type
    }

    /// Declared value shape
    pub fn shape(&self) -> &MemberShape {
        &self.shape
    }

    /// Association descriptor, for association members
    pub fn association(&self) -> Option<&AssociationDescriptor> {
        self.association.as_ref()
    }

    /// Member-level validation rules
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Part of the data contract
    pub fn is_data_member(&self) -> bool {
        self.is_data_member
    }

    /// Part of the identity key
    pub fn is_key_member(&self) -> bool {
        self.is_key_member
    }

    /// Has an association descriptor
    pub fn is_association_member(&self) -> bool {
        self.association.is_some()
    }

    /// Associated entities are owned children
    pub fn is_composition(&self) -> bool {
        self.is_composition
    }

    /// Associated type lives in another domain service
    pub fn is_external_reference(&self) -> bool {
        self.is_external_reference
    }

    /// Associated entities are returned with query results
    pub fn is_include(&self) -> bool {
        self.is_include
    }

    /// Holds many values
    pub fn is_collection(&self) -> bool {
        self.shape.is_collection()
    }

    /// Holds complex type instances
    pub fn is_complex(&self) -> bool {
        self.shape.is_complex()
    }

    /// Has rules of its own or a complex type that needs validation
    pub fn requires_validation(&self) -> bool {
        self.requires_validation
    }

    /// Original value travels back with updates and deletes
    pub fn is_roundtrip_member(&self) -> bool {
        self.is_roundtrip_member
    }

    /// Concurrency version member (concurrency check and timestamp)
    pub fn is_version_member(&self) -> bool {
        self.is_concurrency_check && self.is_timestamp
    }

    /// Participates in optimistic concurrency checks
    pub fn is_concurrency_check(&self) -> bool {
        self.is_concurrency_check
    }

    /// Store values may be merged into this member
    pub fn is_mergeable(&self) -> bool {
        self.is_mergeable
    }

    /// Declared with a public getter
    pub fn has_getter(&self) -> bool {
        self.has_getter
    }

    /// Cached accessor pair, built on first use
    pub fn accessor(&self) -> &MemberAccessor {
        self.accessor
            .get_or_init(|| MemberAccessor::build(&self.name, self.has_getter))
    }

    /// Read this member from `entity`
    pub fn get_value(&self, entity: &Entity) -> Option<Value> {
        self.accessor().get(entity)
    }

    /// Write this member on `entity` if the value differs
    pub fn set_value(&self, entity: &Entity, value: Value) -> bool {
        self.accessor().set(entity, value)
    }
}

impl fmt::Debug for MetaMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaMember")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("shape", &self.shape)
            .field("is_key_member", &self.is_key_member)
            .field("is_association_member", &self.is_association_member())
            .field("requires_validation", &self.requires_validation)
            .finish_non_exhaustive()
    }
}
