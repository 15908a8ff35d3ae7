//! Per-type metadata
//!
//! A [`MetaType`] is computed once from a [`TypeDescriptor`] and never
//! changes afterwards. It answers the questions the change-set pipeline asks
//! about a type: its identity key, its associations, whether original values
//! must round-trip, and whether instances need validation.
//!
//! ## Round-trip rule
//!
//! Original values are sent back unless a single authoritative version member
//! (concurrency check + timestamp) exists and no other non-key member asks for
//! round-tripping:
//!
//! ```text
//! should_roundtrip_original = version_members != 1
//!                          || any(roundtrip && !key && !version)
//! ```
//!
//! ## Validation requirement
//!
//! A type requires validation if it, or any complex type reachable from it
//! through readable complex members, carries validation rules. Reachability
//! is computed with an explicit worklist and visited set, so self-referential
//! complex graphs terminate and deep graphs do not grow the stack.

use crate::descriptor::{EntityActionDescriptor, MemberShape, TypeDescriptor, TypeKind};
use crate::meta_member::MetaMember;
use crate::provider::MetadataProvider;
use crate::rules::ValidationRule;
use ria_core::{Entity, Error, Result, TypeName, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Computed metadata of one entity or complex type
#[derive(Debug)]
pub struct MetaType {
    type_name: TypeName,
    kind: TypeKind,
    members: BTreeMap<String, Arc<MetaMember>>,
    key_members: Vec<Arc<MetaMember>>,
    data_members: Vec<Arc<MetaMember>>,
    association_members: Vec<Arc<MetaMember>>,
    child_types: BTreeSet<TypeName>,
    has_composition: bool,
    has_complex_members: bool,
    should_roundtrip_original: bool,
    requires_validation: bool,
    type_rules: Vec<ValidationRule>,
    custom_actions: BTreeMap<String, EntityActionDescriptor>,
}

impl MetaType {
    /// Build metadata for `descriptor`, resolving complex types through `provider`
    pub fn build(descriptor: &TypeDescriptor, provider: &dyn MetadataProvider) -> Result<Self> {
        let mut reach = ValidationReach::new(provider);

        // Members are ordered by name for determinism
        let mut ordered: Vec<_> = descriptor.members().iter().collect();
        ordered.sort_by(|a, b| a.name().cmp(b.name()));

        let mut members = BTreeMap::new();
        for member in ordered {
            let complex_requires_validation = match member.shape() {
                MemberShape::Complex(t) | MemberShape::ComplexCollection(t) => reach.requires_validation(t)?,
                _ => false,
            };
            let meta = MetaMember::new(
                descriptor.name(),
                member,
                descriptor.roundtrip_original,
                complex_requires_validation,
            );
            members.insert(member.name().to_string(), Arc::new(meta));
        }

        let key_members: Vec<_> = members.values().filter(|m| m.is_key_member()).cloned().collect();
        let data_members: Vec<_> = members.values().filter(|m| m.is_data_member()).cloned().collect();
        let association_members: Vec<_> = members
            .values()
            .filter(|m| m.is_association_member())
            .cloned()
            .collect();

        let child_types: BTreeSet<TypeName> = members
            .values()
            .filter(|m| m.is_composition())
            .filter_map(|m| m.shape().referenced_type().cloned())
            .collect();

        let version_members = members.values().filter(|m| m.is_version_member()).count();
        let should_roundtrip_original = version_members != 1
            || members
                .values()
                .any(|m| m.is_roundtrip_member() && !m.is_key_member() && !m.is_version_member());

        let requires_validation =
            !descriptor.rules().is_empty() || members.values().any(|m| m.requires_validation());

        let custom_actions = descriptor
            .actions()
            .iter()
            .map(|a| (a.name.clone(), a.clone()))
            .collect();

        Ok(Self {
            type_name: descriptor.name().clone(),
            kind: descriptor.kind(),
            has_composition: !child_types.is_empty(),
            has_complex_members: members.values().any(|m| m.is_complex()),
            members,
            key_members,
            data_members,
            association_members,
            child_types,
            should_roundtrip_original,
            requires_validation,
            type_rules: descriptor.rules().to_vec(),
            custom_actions,
        })
    }

    /// Type name
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Whether this is a complex type
    pub fn is_complex(&self) -> bool {
        self.kind == TypeKind::Complex
    }

    /// Whether any member holds complex type instances
    pub fn has_complex_members(&self) -> bool {
        self.has_complex_members
    }

    /// Whether any member is a composition
    pub fn has_composition(&self) -> bool {
        self.has_composition
    }

    /// Whether clients must send original values with updates and deletes
    pub fn should_roundtrip_original(&self) -> bool {
        self.should_roundtrip_original
    }

    /// Whether instances need validation
    pub fn requires_validation(&self) -> bool {
        self.requires_validation
    }

    /// All members, ordered by name
    pub fn members(&self) -> impl Iterator<Item = &Arc<MetaMember>> {
        self.members.values()
    }

    /// Member by name
    pub fn member(&self, name: &str) -> Option<&Arc<MetaMember>> {
        self.members.get(name)
    }

    /// Key members, ordered by name
    pub fn key_members(&self) -> &[Arc<MetaMember>] {
        &self.key_members
    }

    /// Data members, ordered by name
    pub fn data_members(&self) -> &[Arc<MetaMember>] {
        &self.data_members
    }

    /// Association members, ordered by name
    pub fn association_members(&self) -> &[Arc<MetaMember>] {
        &self.association_members
    }

    /// Association member by name
    ///
    /// Fails if the type has no such member or the member is not an association.
    pub fn association_member(&self, name: &str) -> Result<&Arc<MetaMember>> {
        let member = self
            .members
            .get(name)
            .ok_or_else(|| Error::unknown_member(self.type_name.as_str(), name))?;
        if !member.is_association_member() {
            return Err(Error::invalid_operation(format!(
                "member '{}' of {} is not an association",
                name, self.type_name
            )));
        }
        Ok(member)
    }

    /// Types reachable through composition members
    pub fn child_types(&self) -> &BTreeSet<TypeName> {
        &self.child_types
    }

    /// Type-level validation rules
    pub fn type_rules(&self) -> &[ValidationRule] {
        &self.type_rules
    }

    /// Custom action by name
    pub fn custom_action(&self, name: &str) -> Option<&EntityActionDescriptor> {
        self.custom_actions.get(name)
    }

    /// All custom actions, by name
    pub fn custom_actions(&self) -> &BTreeMap<String, EntityActionDescriptor> {
        &self.custom_actions
    }

    /// Identity key of `entity`: key member values in key-member order
    pub fn key_values(&self, entity: &Entity) -> Vec<Value> {
        self.key_members
            .iter()
            .map(|m| m.get_value(entity).unwrap_or(Value::Null))
            .collect()
    }
}

/// Memoized "does this complex type need validation" walk
struct ValidationReach<'a> {
    provider: &'a dyn MetadataProvider,
    memo: HashMap<TypeName, bool>,
}

impl<'a> ValidationReach<'a> {
    fn new(provider: &'a dyn MetadataProvider) -> Self {
        Self {
            provider,
            memo: HashMap::new(),
        }
    }

    fn requires_validation(&mut self, root: &TypeName) -> Result<bool> {
        if let Some(&known) = self.memo.get(root) {
            return Ok(known);
        }

        let mut visited: HashSet<TypeName> = HashSet::new();
        let mut worklist: VecDeque<TypeName> = VecDeque::new();
        visited.insert(root.clone());
        worklist.push_back(root.clone());

        let mut found = false;
        while let Some(current) = worklist.pop_front() {
            if self.memo.get(&current) == Some(&true) {
                found = true;
                break;
            }
            let descriptor = self
                .provider
                .describe(&current)
                .ok_or_else(|| Error::unknown_type(current.as_str()))?;
            if descriptor.has_local_rules() {
                found = true;
                break;
            }
            for member in descriptor.members().iter().filter(|m| m.has_getter) {
                if let MemberShape::Complex(t) | MemberShape::ComplexCollection(t) = member.shape() {
                    if visited.insert(t.clone()) {
                        worklist.push_back(t.clone());
                    }
                }
            }
        }

        // A negative answer holds for every type visited: none of them reaches a rule
        if found {
            self.memo.insert(root.clone(), true);
        } else {
            for t in visited {
                self.memo.insert(t, false);
            }
        }
        Ok(found)
    }
}
