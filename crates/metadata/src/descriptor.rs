//! Declarative type descriptors
//!
//! Every entity and complex type is described once, at startup, by a
//! [`TypeDescriptor`]. The descriptor lists the type's members with their
//! value shape and markers (key, association, composition, round-trip, ...)
//! and replaces runtime attribute inspection.
//!
//! ```
//! use ria_metadata::{AssociationDescriptor, MemberDescriptor, TypeDescriptor};
//!
//! let customer = TypeDescriptor::entity("Customer")
//!     .member(MemberDescriptor::int("Id").key())
//!     .member(MemberDescriptor::string("Name").required())
//!     .member(MemberDescriptor::entity_collection(
//!         "Orders",
//!         "Order",
//!         AssociationDescriptor::new("Customer_Orders", &["Id"], &["CustomerId"]),
//!     ));
//! assert_eq!(customer.members().len(), 3);
//! ```

use crate::rules::ValidationRule;
use ria_core::TypeName;

/// Whether a descriptor describes an entity or a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Identity-bearing type with key members
    Entity,
    /// Structured value without identity, embedded in its owner
    Complex,
}

/// Primitive member value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Boolean
    Bool,
    /// 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 string
    String,
    /// Raw bytes
    Bytes,
    /// Untyped scalar
    Any,
}

/// Declared shape of a member value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberShape {
    /// Single primitive value
    Scalar(ScalarKind),
    /// Array of primitive values
    ScalarCollection(ScalarKind),
    /// Single complex type instance
    Complex(TypeName),
    /// Array of complex type instances
    ComplexCollection(TypeName),
    /// Reference to one entity (singleton association)
    Entity(TypeName),
    /// Collection of entities (collection association)
    EntityCollection(TypeName),
}

impl MemberShape {
    /// Whether the shape holds many values
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            MemberShape::ScalarCollection(_)
                | MemberShape::ComplexCollection(_)
                | MemberShape::EntityCollection(_)
        )
    }

    /// Whether the shape holds complex type instances
    pub fn is_complex(&self) -> bool {
        matches!(self, MemberShape::Complex(_) | MemberShape::ComplexCollection(_))
    }

    /// Whether the shape holds entities
    pub fn is_entity(&self) -> bool {
        matches!(self, MemberShape::Entity(_) | MemberShape::EntityCollection(_))
    }

    /// The complex or entity type the shape refers to
    pub fn referenced_type(&self) -> Option<&TypeName> {
        match self {
            MemberShape::Complex(t)
            | MemberShape::ComplexCollection(t)
            | MemberShape::Entity(t)
            | MemberShape::EntityCollection(t) => Some(t),
            _ => None,
        }
    }
}

/// Association between two entity types
///
/// `this_key` names members of the declaring type, `other_key` members of
/// the associated type; pairs at the same position must be equal for two
/// instances to be associated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDescriptor {
    /// Association name, shared by both ends
    pub name: String,
    /// Key members on the declaring side
    pub this_key: Vec<String>,
    /// Key members on the associated side
    pub other_key: Vec<String>,
    /// Whether the declaring side holds the foreign key
    pub is_foreign_key: bool,
}

impl AssociationDescriptor {
    /// Describe an association by name and key mapping
    pub fn new(name: impl Into<String>, this_key: &[&str], other_key: &[&str]) -> Self {
        Self {
            name: name.into(),
            this_key: this_key.iter().map(|k| (*k).to_string()).collect(),
            other_key: other_key.iter().map(|k| (*k).to_string()).collect(),
            is_foreign_key: false,
        }
    }

    /// Mark the declaring side as holding the foreign key
    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }
}

/// Declaration of one member of a type
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub(crate) name: String,
    pub(crate) shape: MemberShape,
    pub(crate) key: bool,
    pub(crate) association: Option<AssociationDescriptor>,
    pub(crate) composition: bool,
    pub(crate) external_reference: bool,
    pub(crate) include: bool,
    pub(crate) exclude: bool,
    pub(crate) roundtrip_original: bool,
    pub(crate) concurrency_check: bool,
    pub(crate) timestamp: bool,
    pub(crate) merge_excluded: bool,
    pub(crate) has_getter: bool,
    pub(crate) rules: Vec<ValidationRule>,
}

impl MemberDescriptor {
    /// Member of any shape without markers
    pub fn new(name: impl Into<String>, shape: MemberShape) -> Self {
        Self {
            name: name.into(),
            shape,
            key: false,
            association: None,
            composition: false,
            external_reference: false,
            include: false,
            exclude: false,
            roundtrip_original: false,
            concurrency_check: false,
            timestamp: false,
            merge_excluded: false,
            has_getter: true,
            rules: Vec::new(),
        }
    }

    /// Integer member
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, MemberShape::Scalar(ScalarKind::Int))
    }

    /// String member
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, MemberShape::Scalar(ScalarKind::String))
    }

    /// Float member
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, MemberShape::Scalar(ScalarKind::Float))
    }

    /// Boolean member
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, MemberShape::Scalar(ScalarKind::Bool))
    }

    /// Bytes member
    pub fn bytes(name: impl Into<String>) -> Self {
        Self::new(name, MemberShape::Scalar(ScalarKind::Bytes))
    }

    /// Complex type member
    pub fn complex(name: impl Into<String>, type_name: impl Into<TypeName>) -> Self {
        Self::new(name, MemberShape::Complex(type_name.into()))
    }

    /// Collection of complex type instances
    pub fn complex_collection(name: impl Into<String>, type_name: impl Into<TypeName>) -> Self {
        Self::new(name, MemberShape::ComplexCollection(type_name.into()))
    }

    /// Singleton association member
    pub fn entity_ref(
        name: impl Into<String>,
        target: impl Into<TypeName>,
        association: AssociationDescriptor,
    ) -> Self {
        let mut member = Self::new(name, MemberShape::Entity(target.into()));
        member.association = Some(association);
        member
    }

    /// Collection association member
    pub fn entity_collection(
        name: impl Into<String>,
        target: impl Into<TypeName>,
        association: AssociationDescriptor,
    ) -> Self {
        let mut member = Self::new(name, MemberShape::EntityCollection(target.into()));
        member.association = Some(association);
        member
    }

    /// Part of the identity key
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// The associated entities are owned children (composition)
    pub fn composition(mut self) -> Self {
        self.composition = true;
        self
    }

    /// The associated type is served by another domain service
    pub fn external_reference(mut self) -> Self {
        self.external_reference = true;
        self
    }

    /// Associated entities are returned with query results
    pub fn include(mut self) -> Self {
        self.include = true;
        self
    }

    /// Excluded from the data contract
    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    /// Original value is sent back with updates and deletes
    pub fn roundtrip_original(mut self) -> Self {
        self.roundtrip_original = true;
        self
    }

    /// Participates in optimistic concurrency checks
    pub fn concurrency_check(mut self) -> Self {
        self.concurrency_check = true;
        self
    }

    /// Store-generated timestamp
    pub fn timestamp(mut self) -> Self {
        self.timestamp = true;
        self
    }

    /// Concurrency version member: concurrency check plus timestamp
    pub fn version(self) -> Self {
        self.concurrency_check().timestamp()
    }

    /// Not merged when store values are merged into a client instance
    pub fn exclude_from_merge(mut self) -> Self {
        self.merge_excluded = true;
        self
    }

    /// Declared without a public getter
    pub fn without_getter(mut self) -> Self {
        self.has_getter = false;
        self
    }

    /// Attach a validation rule
    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Shorthand for [`ValidationRule::Required`]
    pub fn required(self) -> Self {
        self.rule(ValidationRule::Required)
    }

    /// Shorthand for [`ValidationRule::StringLength`]
    pub fn string_length(self, min: usize, max: usize) -> Self {
        self.rule(ValidationRule::StringLength { min, max })
    }

    /// Shorthand for [`ValidationRule::Range`]
    pub fn range(self, min: f64, max: f64) -> Self {
        self.rule(ValidationRule::Range { min, max })
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value shape
    pub fn shape(&self) -> &MemberShape {
        &self.shape
    }

    /// Attached validation rules
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }
}

/// Parameter of an entity action
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Parameter name
    pub name: String,
    /// Expected value kind
    pub kind: ScalarKind,
    /// Validation rules applied before the action runs
    pub rules: Vec<ValidationRule>,
}

impl ParameterDescriptor {
    /// Parameter without rules
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            rules: Vec::new(),
        }
    }

    /// Attach a validation rule
    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Custom action invocable on an entity as part of a change set
#[derive(Debug, Clone)]
pub struct EntityActionDescriptor {
    /// Action name
    pub name: String,
    /// Ordered parameters (the entity itself is implicit)
    pub parameters: Vec<ParameterDescriptor>,
}

impl EntityActionDescriptor {
    /// Action without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter
    pub fn param(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Declaration of an entity or complex type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub(crate) name: TypeName,
    pub(crate) kind: TypeKind,
    pub(crate) members: Vec<MemberDescriptor>,
    pub(crate) rules: Vec<ValidationRule>,
    pub(crate) roundtrip_original: bool,
    pub(crate) actions: Vec<EntityActionDescriptor>,
}

impl TypeDescriptor {
    fn new(name: impl Into<TypeName>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
            rules: Vec::new(),
            roundtrip_original: false,
            actions: Vec::new(),
        }
    }

    /// Describe an entity type
    pub fn entity(name: impl Into<TypeName>) -> Self {
        Self::new(name, TypeKind::Entity)
    }

    /// Describe a complex type
    pub fn complex(name: impl Into<TypeName>) -> Self {
        Self::new(name, TypeKind::Complex)
    }

    /// Append a member
    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Attach a type-level validation rule
    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Round-trip the original value of every data member
    pub fn roundtrip_original(mut self) -> Self {
        self.roundtrip_original = true;
        self
    }

    /// Declare a custom entity action
    pub fn action(mut self, action: EntityActionDescriptor) -> Self {
        self.actions.push(action);
        self
    }

    /// Type name
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Entity or complex
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Declared members in declaration order
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Type-level validation rules
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Declared entity actions
    pub fn actions(&self) -> &[EntityActionDescriptor] {
        &self.actions
    }

    /// Whether the type or one of its readable members carries validation rules
    pub(crate) fn has_local_rules(&self) -> bool {
        !self.rules.is_empty()
            || self
                .members
                .iter()
                .any(|m| m.has_getter && !m.rules.is_empty())
    }
}
