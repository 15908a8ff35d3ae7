//! Validation
//!
//! [`Validator`] checks entities against the rules declared in their
//! metadata. Member rules run first, then type-level rules. Complex members
//! are descended into only when their metadata says they need validation;
//! errors inside them name the member by its dotted path
//! (`Address.Street`, `Lines[2].Quantity`).

use crate::services::{ServiceProvider, SharedService};
use ria_changeset::ValidationResultInfo;
use ria_core::{Entity, Result, Value};
use ria_metadata::{EntityActionDescriptor, MemberShape, MetaType, MetaTypeRegistry, RuleContext};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Context of one validation pass
///
/// Holds the entity under validation, so rules can read it for as long as the
/// context lives.
#[derive(Clone)]
pub struct ValidationContext {
    instance: Option<Entity>,
    member_name: Option<String>,
    display_name: String,
    provider: Option<Arc<dyn ServiceProvider>>,
    items: Arc<BTreeMap<String, Value>>,
}

impl ValidationContext {
    /// Context for validating `instance`, or free-standing values when `None`
    pub fn new(
        instance: Option<Entity>,
        provider: Option<Arc<dyn ServiceProvider>>,
        items: BTreeMap<String, Value>,
    ) -> Self {
        let display_name = instance
            .as_ref()
            .map(|e| e.type_name().to_string())
            .unwrap_or_default();
        Self {
            instance,
            member_name: None,
            display_name,
            provider,
            items: Arc::new(items),
        }
    }

    /// Context for validating `entity`
    pub fn for_entity(entity: &Entity, provider: Option<Arc<dyn ServiceProvider>>) -> Self {
        Self::new(Some(entity.clone()), provider, BTreeMap::new())
    }

    /// Same context narrowed to one member
    pub fn for_member(&self, member: &str) -> Self {
        Self {
            member_name: Some(member.to_string()),
            display_name: member.to_string(),
            ..self.clone()
        }
    }

    /// Same context for type-level rules of `type_name`
    pub fn for_type(&self, type_name: &str) -> Self {
        Self {
            member_name: None,
            display_name: type_name.to_string(),
            ..self.clone()
        }
    }

    /// Entity under validation
    pub fn instance(&self) -> Option<&Entity> {
        self.instance.as_ref()
    }

    /// Member under validation, `None` for type-level checks
    pub fn member_name(&self) -> Option<&str> {
        self.member_name.as_deref()
    }

    /// Name used in error messages
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Shared items
    pub fn items(&self) -> &BTreeMap<String, Value> {
        &self.items
    }

    /// Typed service lookup
    pub fn get_service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_service_any(TypeId::of::<T>())
            .and_then(|s| s.downcast::<T>().ok())
    }
}

impl ServiceProvider for ValidationContext {
    fn get_service_any(&self, type_id: TypeId) -> Option<SharedService> {
        self.provider.as_ref().and_then(|p| p.get_service_any(type_id))
    }
}

impl RuleContext for ValidationContext {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn member_name(&self) -> Option<&str> {
        self.member_name.as_deref()
    }

    fn instance(&self) -> Option<&Entity> {
        self.instance.as_ref()
    }

    fn item(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    fn service_any(&self, type_id: TypeId) -> Option<SharedService> {
        self.get_service_any(type_id)
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("member_name", &self.member_name)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Rule-driven validator over registered metadata
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    registry: &'a MetaTypeRegistry,
}

impl<'a> Validator<'a> {
    /// Validator resolving types through `registry`
    pub fn new(registry: &'a MetaTypeRegistry) -> Self {
        Self { registry }
    }

    /// Validate an entity; an empty list means it is valid
    pub fn validate_entity(&self, entity: &Entity, context: &ValidationContext) -> Result<Vec<ValidationResultInfo>> {
        let meta = self.registry.get_meta_type(entity.type_name())?;
        let mut errors = Vec::new();
        if meta.requires_validation() {
            self.validate_instance(&meta, &|name: &str| entity.get(name), "", context, &mut errors)?;
        }
        Ok(errors)
    }

    /// Validate entity-action parameters against their declared rules
    ///
    /// Errors name the offending parameter.
    pub fn validate_parameters(
        &self,
        action: &EntityActionDescriptor,
        parameters: &[Value],
        context: &ValidationContext,
    ) -> Vec<ValidationResultInfo> {
        let mut errors = Vec::new();
        for (descriptor, value) in action.parameters.iter().zip(parameters) {
            let ctx = context.for_member(&descriptor.name);
            for rule in &descriptor.rules {
                if let Some(message) = rule.check(value, &ctx) {
                    errors.push(ValidationResultInfo::new(message, [descriptor.name.clone()]));
                }
            }
        }
        errors
    }

    fn validate_instance(
        &self,
        meta: &MetaType,
        read: &dyn Fn(&str) -> Option<Value>,
        prefix: &str,
        context: &ValidationContext,
        errors: &mut Vec<ValidationResultInfo>,
    ) -> Result<()> {
        for member in meta.members().filter(|m| m.requires_validation()) {
            let path = format!("{}{}", prefix, member.name());
            let value = read(member.name()).unwrap_or(Value::Null);
            let member_ctx = context.for_member(member.name());

            for rule in member.rules() {
                if let Some(message) = rule.check(&value, &member_ctx) {
                    errors.push(ValidationResultInfo::new(message, [path.clone()]));
                }
            }

            let complex_type = match member.shape() {
                MemberShape::Complex(t) | MemberShape::ComplexCollection(t) => t,
                _ => continue,
            };
            let complex = self.registry.get_meta_type(complex_type)?;
            if !complex.requires_validation() {
                continue;
            }
            match &value {
                Value::Object(fields) => {
                    let nested = format!("{}.", path);
                    self.validate_complex(&complex, fields, &nested, context, errors)?;
                }
                Value::Array(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if let Value::Object(fields) = item {
                            let nested = format!("{}[{}].", path, index);
                            self.validate_complex(&complex, fields, &nested, context, errors)?;
                        }
                    }
                }
                _ => {}
            }
        }

        if !meta.type_rules().is_empty() {
            let whole = Value::Object(collect_data(meta, read));
            let type_ctx = context.for_type(meta.type_name().as_str());
            for rule in meta.type_rules() {
                if let Some(message) = rule.check(&whole, &type_ctx) {
                    let members = prefix.strip_suffix('.').map(str::to_string);
                    errors.push(ValidationResultInfo::new(message, members));
                }
            }
        }
        Ok(())
    }

    fn validate_complex(
        &self,
        meta: &MetaType,
        fields: &BTreeMap<String, Value>,
        prefix: &str,
        context: &ValidationContext,
        errors: &mut Vec<ValidationResultInfo>,
    ) -> Result<()> {
        self.validate_instance(meta, &|name: &str| fields.get(name).cloned(), prefix, context, errors)
    }
}

fn collect_data(meta: &MetaType, read: &dyn Fn(&str) -> Option<Value>) -> BTreeMap<String, Value> {
    meta.data_members()
        .iter()
        .filter_map(|m| read(m.name()).map(|v| (m.name().to_string(), v)))
        .collect()
}
