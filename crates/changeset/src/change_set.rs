//! The change set of one submit
//!
//! [`ChangeSet`] owns the ordered entries of a batch and offers the views a
//! domain service needs while executing it. Construction checks the batch
//! structure; anything it accepts can be reconciled without further checks.

use crate::entry::{AssociationMap, ChangeSetEntry};
use ria_core::{DomainOperation, Entity, Error, Result, Value};
use rustc_hash::FxHashSet;

/// Ordered entries of a submitted batch
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    entries: Vec<ChangeSetEntry>,
}

impl ChangeSet {
    /// Build a change set, validating the batch structure
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChangeSet`] when ids repeat, an operation is not
    /// a change-set operation, an insert carries an original, an original has a
    /// different type than its entity, an association names an id outside the
    /// batch, or a delete carries entity actions.
    pub fn new(entries: Vec<ChangeSetEntry>) -> Result<Self> {
        let mut ids = FxHashSet::default();
        for entry in &entries {
            if !ids.insert(entry.id) {
                return Err(Error::invalid_change_set(format!("duplicate entry id {}", entry.id)));
            }
        }

        for entry in &entries {
            validate_entry(entry, &ids)?;
        }

        Ok(Self { entries })
    }

    /// Entries in submission order
    pub fn entries(&self) -> &[ChangeSetEntry] {
        &self.entries
    }

    /// Mutable entries in submission order
    pub fn entries_mut(&mut self) -> &mut [ChangeSetEntry] {
        &mut self.entries
    }

    /// Entry with the given id
    pub fn entry(&self, id: i32) -> Option<&ChangeSetEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Mutable entry with the given id
    pub fn entry_mut(&mut self, id: i32) -> Option<&mut ChangeSetEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities being inserted
    pub fn added_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities_with(DomainOperation::Insert)
    }

    /// Entities being updated
    pub fn modified_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities_with(DomainOperation::Update)
    }

    /// Entities being deleted
    pub fn removed_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities_with(DomainOperation::Delete)
    }

    fn entities_with(&self, operation: DomainOperation) -> impl Iterator<Item = &Entity> {
        self.entries
            .iter()
            .filter(move |e| e.operation == operation)
            .map(|e| &e.entity)
    }

    /// Entry holding this exact instance
    pub fn entry_for(&self, entity: &Entity) -> Option<&ChangeSetEntry> {
        self.entries.iter().find(|e| e.entity.same_instance(entity))
    }

    /// Original of this exact instance, if the client sent one
    pub fn get_original(&self, entity: &Entity) -> Option<&Entity> {
        self.entry_for(entity).and_then(|e| e.original_entity.as_ref())
    }

    /// Changed entries referenced by an association member of `entity`
    ///
    /// Entries with no operation are skipped. Fails if `entity` is not part of
    /// the batch or the member does not hold an association.
    pub fn associated_changes(&self, entity: &Entity, member: &str) -> Result<Vec<&ChangeSetEntry>> {
        if self.entry_for(entity).is_none() {
            return Err(Error::invalid_operation(format!(
                "{} instance is not part of the change set",
                entity.type_name()
            )));
        }
        let value = entity.get_or_null(member);
        let targets = match &value {
            Value::Entity(link) => link.upgrade().into_iter().collect(),
            Value::EntitySet(_) => value.as_entities().unwrap_or_default(),
            Value::Null => Vec::new(),
            other => {
                return Err(Error::invalid_operation(format!(
                    "member '{}' of {} holds {} rather than an association",
                    member,
                    entity.type_name(),
                    other.type_name()
                )))
            }
        };
        Ok(targets
            .iter()
            .filter_map(|t| self.entry_for(t))
            .filter(|e| e.operation != DomainOperation::None)
            .collect())
    }

    /// Replace a client entity with the instance returned to the client
    ///
    /// The replacement must have the same type. Association members of every
    /// entry that pointed at `client` are re-pointed at `returned`.
    pub fn replace(&mut self, client: &Entity, returned: Entity) -> Result<()> {
        if client.type_name() != returned.type_name() {
            return Err(Error::invalid_operation(format!(
                "cannot replace {} with {}",
                client.type_name(),
                returned.type_name()
            )));
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.entity.same_instance(client))
            .ok_or_else(|| {
                Error::invalid_operation(format!(
                    "{} instance is not part of the change set",
                    client.type_name()
                ))
            })?;
        entry.entity = returned.clone();
        for entry in &self.entries {
            repoint_links(&entry.entity, client, &returned);
            if let Some(original) = &entry.original_entity {
                repoint_links(original, client, &returned);
            }
        }
        Ok(())
    }

    /// Whether any entry carries errors or conflicts
    pub fn has_error(&self) -> bool {
        self.entries.iter().any(ChangeSetEntry::has_error)
    }

    /// Whether any entry carries a conflict
    pub fn has_conflicts(&self) -> bool {
        self.entries.iter().any(ChangeSetEntry::has_conflict)
    }

    /// Give up the entries
    pub fn into_entries(self) -> Vec<ChangeSetEntry> {
        self.entries
    }
}

fn repoint_links(holder: &Entity, from: &Entity, to: &Entity) {
    holder.modify(|members| {
        for value in members.values_mut() {
            match value {
                Value::Entity(link) if link.points_to(from) => *link = to.link(),
                Value::EntitySet(links) => {
                    for link in links.iter_mut().filter(|l| l.points_to(from)) {
                        *link = to.link();
                    }
                }
                _ => {}
            }
        }
    });
}

fn validate_entry(entry: &ChangeSetEntry, ids: &FxHashSet<i32>) -> Result<()> {
    let id = entry.id;
    match entry.operation {
        DomainOperation::None | DomainOperation::Insert | DomainOperation::Update | DomainOperation::Delete => {}
        other => {
            return Err(Error::invalid_change_set(format!(
                "entry {} has operation {}, which is not allowed in a change set",
                id, other
            )))
        }
    }

    if let Some(original) = &entry.original_entity {
        if entry.operation == DomainOperation::Insert {
            return Err(Error::invalid_change_set(format!(
                "insert entry {} carries an original entity",
                id
            )));
        }
        if original.type_name() != entry.entity.type_name() {
            return Err(Error::invalid_change_set(format!(
                "entry {} has a {} original for a {} entity",
                id,
                original.type_name(),
                entry.entity.type_name()
            )));
        }
    }

    if entry.operation == DomainOperation::Delete && entry.entity_actions.as_ref().map_or(false, |a| !a.is_empty()) {
        return Err(Error::invalid_change_set(format!(
            "delete entry {} carries entity actions",
            id
        )));
    }

    check_ids(id, entry.associations.as_ref(), ids)?;
    check_ids(id, entry.original_associations.as_ref(), ids)
}

fn check_ids(id: i32, map: Option<&AssociationMap>, ids: &FxHashSet<i32>) -> Result<()> {
    for (member, referenced) in map.into_iter().flatten() {
        if let Some(missing) = referenced.iter().find(|r| !ids.contains(r)) {
            return Err(Error::invalid_change_set(format!(
                "entry {} association '{}' refers to unknown entry {}",
                id, member, missing
            )));
        }
    }
    Ok(())
}
