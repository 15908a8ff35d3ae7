//! Association reestablishment
//!
//! Entries arrive as independently deserialized payloads: an entity that is
//! referenced from several places arrives once, as its own entry, and the
//! references are integer ids. This stage rebuilds the object graph so that
//! every reference to an id resolves to the very instance held by that
//! id's entry.
//!
//! ## Algorithm
//!
//! 1. Map each id to its canonical `{entity, original}` pair.
//! 2. Point every entry at its canonical instances.
//! 3. Group entries with association payload by entity type and resolve the
//!    association members of each type once.
//! 4. For each entry, link every association member to the referenced
//!    entities. Collections gain only members they do not already hold;
//!    singletons are written only when the reference changes.

use crate::change_set::ChangeSet;
use crate::entry::AssociationMap;
use ria_core::{Entity, Error, Result, TypeName, Value};
use ria_metadata::{MetaMember, MetaType, MetaTypeRegistry};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
struct EntityPair {
    entity: Entity,
    original: Option<Entity>,
}

/// Rebuild entity references between the entries of `change_set`
///
/// # Errors
///
/// Fails with [`Error::UnknownType`] or [`Error::UnknownMember`] when an entry
/// names a type or member without metadata, and with
/// [`Error::InvalidOperation`] when an association member cannot hold the
/// referenced entities (a null collection, or a value of another kind).
pub fn reestablish_associations(mut change_set: ChangeSet, registry: &MetaTypeRegistry) -> Result<ChangeSet> {
    let canonical: FxHashMap<i32, EntityPair> = change_set
        .entries()
        .iter()
        .map(|e| {
            (
                e.id,
                EntityPair {
                    entity: e.entity.clone(),
                    original: e.original_entity.clone(),
                },
            )
        })
        .collect();

    for entry in change_set.entries_mut() {
        if let Some(pair) = canonical.get(&entry.id) {
            entry.entity = pair.entity.clone();
            entry.original_entity = pair.original.clone();
        }
    }

    // Entries with association payload, grouped by entity type
    let mut groups: BTreeMap<TypeName, Vec<usize>> = BTreeMap::new();
    for (index, entry) in change_set.entries().iter().enumerate() {
        if entry.has_associations() {
            groups.entry(entry.entity.type_name().clone()).or_default().push(index);
        }
    }

    let mut visited: FxHashSet<i32> = FxHashSet::default();
    let mut linked = 0usize;
    for (type_name, indices) in &groups {
        let meta = registry.get_meta_type(type_name)?;
        let mut members = AssociationMembers::new(meta);

        for &index in indices {
            let entry = &change_set.entries()[index];
            if !visited.insert(entry.id) {
                continue;
            }

            if let Some(associations) = &entry.associations {
                linked += link_all(&entry.entity, associations, &mut members, &canonical, |pair| pair.entity.clone())?;
            }
            if let (Some(original), Some(associations)) = (&entry.original_entity, &entry.original_associations) {
                linked += link_all(original, associations, &mut members, &canonical, |pair| {
                    pair.original.clone().unwrap_or_else(|| pair.entity.clone())
                })?;
            }
        }
    }

    debug!(
        target: "ria::changeset",
        entries = change_set.len(),
        types = groups.len(),
        linked,
        "Reestablished associations"
    );
    Ok(change_set)
}

/// Association members of one type, resolved on first use
struct AssociationMembers {
    meta: Arc<MetaType>,
    resolved: FxHashMap<String, Arc<MetaMember>>,
}

impl AssociationMembers {
    fn new(meta: Arc<MetaType>) -> Self {
        Self {
            meta,
            resolved: FxHashMap::default(),
        }
    }

    fn member(&mut self, name: &str) -> Result<Arc<MetaMember>> {
        if let Some(m) = self.resolved.get(name) {
            return Ok(Arc::clone(m));
        }
        let member = Arc::clone(self.meta.association_member(name)?);
        self.resolved.insert(name.to_string(), Arc::clone(&member));
        Ok(member)
    }
}

fn link_all(
    entity: &Entity,
    associations: &AssociationMap,
    members: &mut AssociationMembers,
    canonical: &FxHashMap<i32, EntityPair>,
    pick: impl Fn(&EntityPair) -> Entity,
) -> Result<usize> {
    let mut linked = 0;
    for (name, ids) in associations {
        let member = members.member(name)?;
        let targets = ids
            .iter()
            .map(|id| {
                canonical
                    .get(id)
                    .map(&pick)
                    .ok_or_else(|| Error::invalid_change_set(format!("association '{}' refers to unknown entry {}", name, id)))
            })
            .collect::<Result<Vec<_>>>()?;
        linked += link_member(entity, &member, &targets)?;
    }
    Ok(linked)
}

/// Link `targets` into one association member of `entity`
///
/// Returns how many references were added or changed. A collection member
/// missing from the instance starts out empty; an explicit null is an error.
pub fn link_member(entity: &Entity, member: &MetaMember, targets: &[Entity]) -> Result<usize> {
    let name = member.name();
    if !member.is_collection() {
        return Ok(match targets.last() {
            Some(target) => usize::from(member.set_value(entity, Value::entity(target))),
            None => 0,
        });
    }

    let added = entity.modify(|values| {
        let slot = values.entry(name.to_string()).or_insert_with(Value::empty_set);
        match slot {
            Value::EntitySet(links) => {
                let mut added = 0;
                for target in targets {
                    if !links.iter().any(|l| l.points_to(target)) {
                        links.push(target.link());
                        added += 1;
                    }
                }
                Ok(added)
            }
            Value::Null => Err(Error::invalid_operation(format!(
                "association collection '{}' on {} is null",
                name,
                entity.type_name()
            ))),
            other => Err(Error::invalid_operation(format!(
                "association member '{}' on {} holds {} and cannot hold entities",
                name,
                entity.type_name(),
                other.type_name()
            ))),
        }
    })?;

    if added > 0 {
        entity.notify(name);
    }
    Ok(added)
}
