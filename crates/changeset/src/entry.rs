//! Change-set entries
//!
//! A [`ChangeSetEntry`] is one unit of a submitted batch: an entity, the
//! operation to apply to it, and the payload needed to reconcile it with the
//! rest of the batch. Entries are deserialized independently of each other,
//! so entity references between entries travel as integer ids in the
//! association maps.
//!
//! ## Wire shape
//!
//! Fields are serialized in PascalCase. `HasError` is computed when an entry
//! is serialized and ignored when one is read.

use ria_core::{DomainOperation, Entity, Value};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Association member name to the ids of the referenced entries
pub type AssociationMap = BTreeMap<String, Vec<i32>>;

/// A validation or domain error reported for an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationResultInfo {
    /// Error message
    pub message: String,
    /// Application-defined error code
    #[serde(default)]
    pub error_code: i32,
    /// Stack trace, if one was captured
    #[serde(default)]
    pub stack_trace: Option<String>,
    /// Members the error applies to (dotted paths for nested members)
    #[serde(default)]
    pub source_member_names: Vec<String>,
}

impl ValidationResultInfo {
    /// Error with a message and the members it applies to
    pub fn new<I, S>(message: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            error_code: 0,
            stack_trace: None,
            source_member_names: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the error code
    pub fn with_error_code(mut self, code: i32) -> Self {
        self.error_code = code;
        self
    }

    /// Attach a stack trace
    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }
}

/// A custom action to run on an entry's entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityActionInvocation {
    /// Action name
    pub name: String,
    /// Ordered parameters, excluding the entity
    ///
    /// Parameters holding association values fail to serialize.
    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl EntityActionInvocation {
    /// Invocation of `name` with `parameters`
    pub fn new(name: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// One entry of a submitted change set
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeSetEntry {
    /// Synthetic id, unique within the batch
    pub id: i32,
    /// Operation to apply
    pub operation: DomainOperation,
    /// Current entity
    pub entity: Entity,
    /// Last known server state, for updates and deletes
    #[serde(default)]
    pub original_entity: Option<Entity>,
    /// Entity as currently stored, filled in on conflicts
    #[serde(default)]
    pub store_entity: Option<Entity>,
    /// Current associations by member
    #[serde(default)]
    pub associations: Option<AssociationMap>,
    /// Original associations by member
    #[serde(default)]
    pub original_associations: Option<AssociationMap>,
    /// Custom actions to run after the CUD operation
    #[serde(default)]
    pub entity_actions: Option<Vec<EntityActionInvocation>>,
    /// Errors reported for this entry
    #[serde(default)]
    pub validation_errors: Option<Vec<ValidationResultInfo>>,
    /// Members in conflict with the stored entity
    #[serde(default)]
    pub conflict_members: Option<Vec<String>>,
    /// The entity was deleted concurrently
    #[serde(default)]
    pub is_delete_conflict: bool,
    /// The client changed member values
    #[serde(default)]
    pub has_member_changes: bool,
}

impl ChangeSetEntry {
    /// Entry without payload beyond the entity
    pub fn new(id: i32, operation: DomainOperation, entity: Entity) -> Self {
        Self {
            id,
            operation,
            entity,
            original_entity: None,
            store_entity: None,
            associations: None,
            original_associations: None,
            entity_actions: None,
            validation_errors: None,
            conflict_members: None,
            is_delete_conflict: false,
            has_member_changes: false,
        }
    }

    /// Set the original entity
    pub fn with_original(mut self, original: Entity) -> Self {
        self.original_entity = Some(original);
        self
    }

    /// Add ids to an association member
    pub fn with_association(mut self, member: impl Into<String>, ids: &[i32]) -> Self {
        self.associations
            .get_or_insert_with(AssociationMap::new)
            .entry(member.into())
            .or_default()
            .extend_from_slice(ids);
        self
    }

    /// Add ids to an original association member
    pub fn with_original_association(mut self, member: impl Into<String>, ids: &[i32]) -> Self {
        self.original_associations
            .get_or_insert_with(AssociationMap::new)
            .entry(member.into())
            .or_default()
            .extend_from_slice(ids);
        self
    }

    /// Append an entity action
    pub fn with_action(mut self, action: EntityActionInvocation) -> Self {
        self.entity_actions.get_or_insert_with(Vec::new).push(action);
        self
    }

    /// Mark the entry as carrying member changes
    pub fn with_member_changes(mut self) -> Self {
        self.has_member_changes = true;
        self
    }

    /// Whether the entry carries validation errors or a conflict
    pub fn has_error(&self) -> bool {
        self.validation_errors.as_ref().map_or(false, |v| !v.is_empty()) || self.has_conflict()
    }

    /// Whether the entry carries a conflict
    pub fn has_conflict(&self) -> bool {
        self.is_delete_conflict || self.conflict_members.as_ref().map_or(false, |c| !c.is_empty())
    }

    /// Whether any association map is non-empty
    pub fn has_associations(&self) -> bool {
        let non_empty = |m: &Option<AssociationMap>| m.as_ref().map_or(false, |m| !m.is_empty());
        non_empty(&self.associations) || non_empty(&self.original_associations)
    }

    /// Append a validation error
    pub fn add_validation_error(&mut self, error: ValidationResultInfo) {
        self.validation_errors.get_or_insert_with(Vec::new).push(error);
    }

    /// Append several validation errors
    pub fn add_validation_errors(&mut self, errors: impl IntoIterator<Item = ValidationResultInfo>) {
        let mut errors = errors.into_iter().peekable();
        if errors.peek().is_some() {
            self.validation_errors.get_or_insert_with(Vec::new).extend(errors);
        }
    }

    /// Record a member conflict against the stored entity
    pub fn record_conflict(&mut self, store_entity: Entity, members: Vec<String>) {
        self.store_entity = Some(store_entity);
        self.conflict_members = Some(members);
    }

    /// Record that the entity was deleted concurrently
    pub fn record_delete_conflict(&mut self) {
        self.is_delete_conflict = true;
    }

    /// Drop conflict information, after a successful resolution
    pub fn clear_conflict(&mut self) {
        self.store_entity = None;
        self.conflict_members = None;
        self.is_delete_conflict = false;
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireEntry<'a> {
    id: i32,
    operation: DomainOperation,
    entity: &'a Entity,
    original_entity: &'a Option<Entity>,
    store_entity: &'a Option<Entity>,
    associations: &'a Option<AssociationMap>,
    original_associations: &'a Option<AssociationMap>,
    entity_actions: &'a Option<Vec<EntityActionInvocation>>,
    validation_errors: &'a Option<Vec<ValidationResultInfo>>,
    conflict_members: &'a Option<Vec<String>>,
    is_delete_conflict: bool,
    has_member_changes: bool,
    has_error: bool,
}

impl Serialize for ChangeSetEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireEntry {
            id: self.id,
            operation: self.operation,
            entity: &self.entity,
            original_entity: &self.original_entity,
            store_entity: &self.store_entity,
            associations: &self.associations,
            original_associations: &self.original_associations,
            entity_actions: &self.entity_actions,
            validation_errors: &self.validation_errors,
            conflict_members: &self.conflict_members,
            is_delete_conflict: self.is_delete_conflict,
            has_member_changes: self.has_member_changes,
            has_error: self.has_error(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_error_sources() {
        let mut entry = ChangeSetEntry::new(1, DomainOperation::Update, Entity::new("Customer"));
        assert!(!entry.has_error());

        entry.validation_errors = Some(Vec::new());
        assert!(!entry.has_error());

        entry.add_validation_error(ValidationResultInfo::new("bad", ["Name"]));
        assert!(entry.has_error());

        let mut conflicted = ChangeSetEntry::new(2, DomainOperation::Delete, Entity::new("Customer"));
        conflicted.record_delete_conflict();
        assert!(conflicted.has_error());
        conflicted.clear_conflict();
        assert!(!conflicted.has_error());
    }

    #[test]
    fn test_builders_merge_association_ids() {
        let entry = ChangeSetEntry::new(1, DomainOperation::Update, Entity::new("Customer"))
            .with_association("Orders", &[2])
            .with_association("Orders", &[3]);
        assert_eq!(entry.associations.unwrap()["Orders"], vec![2, 3]);
    }

    #[test]
    fn test_wire_shape_is_pascal_case_with_computed_has_error() {
        let mut entry = ChangeSetEntry::new(
            4,
            DomainOperation::Insert,
            Entity::new("Customer").with("Id", 4),
        );
        entry.add_validation_error(ValidationResultInfo::new("bad", ["Name"]).with_error_code(7));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["Id"], 4);
        assert_eq!(json["Operation"], "Insert");
        assert_eq!(json["HasError"], true);
        assert_eq!(json["Entity"]["$type"], "Customer");
        assert_eq!(json["ValidationErrors"][0]["ErrorCode"], 7);
        assert!(json["OriginalEntity"].is_null());
    }

    #[test]
    fn test_has_error_ignored_on_input() {
        let json = r#"{
            "Id": 1,
            "Operation": "Update",
            "Entity": { "$type": "Customer", "Id": { "Int": 1 } },
            "Associations": { "Orders": [2] },
            "HasError": true
        }"#;
        let entry: ChangeSetEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.has_error());
        assert_eq!(entry.entity.get("Id"), Some(Value::Int(1)));
        assert_eq!(entry.associations.unwrap()["Orders"], vec![2]);
        assert!(entry.original_entity.is_none());
    }
}
