//! Dynamic entity instances
//!
//! An [`Entity`] is a shared handle to a typed bag of member values. Handles
//! are cheap to clone and all clones observe the same instance: identity is
//! the handle's pointer, not its content. This is what the change-set
//! reconciliation restores when the same logical object arrives as several
//! independently deserialized payloads.
//!
//! ## Ownership
//!
//! Association members hold [`EntityLink`]s, which do not own their target.
//! The owner of an entity is whoever holds an `Entity` handle (for a submitted
//! batch, the change-set entries). Bidirectional associations such as
//! `Customer.Orders` / `Order.Customer` therefore never keep each other alive.
//!
//! ## Notifications
//!
//! [`Entity::set`] raises a property-changed notification to every subscribed
//! handler after the write. Handlers run outside of the member lock and may
//! read the entity.

use crate::types::TypeName;
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use serde::de::{Error as _, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Key carrying the type name in the serialized form of an entity
pub const TYPE_KEY: &str = "$type";

/// Callback invoked with the entity and the name of the changed member
pub type PropertyChangedHandler = Arc<dyn Fn(&Entity, &str) + Send + Sync>;

struct EntityInner {
    type_name: TypeName,
    members: RwLock<BTreeMap<String, Value>>,
    handlers: Mutex<Vec<PropertyChangedHandler>>,
}

/// Shared handle to an entity instance
#[derive(Clone)]
pub struct Entity(Arc<EntityInner>);

impl Entity {
    /// Create an empty instance of `type_name`
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self::from_members(type_name, BTreeMap::new())
    }

    /// Create an instance with the given members
    pub fn from_members(type_name: impl Into<TypeName>, members: BTreeMap<String, Value>) -> Self {
        Entity(Arc::new(EntityInner {
            type_name: type_name.into(),
            members: RwLock::new(members),
            handlers: Mutex::new(Vec::new()),
        }))
    }

    /// Builder-style member initialization (raises no notification)
    pub fn with(self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.members.write().insert(member.into(), value.into());
        self
    }

    /// Registered type of this instance
    pub fn type_name(&self) -> &TypeName {
        &self.0.type_name
    }

    /// Current value of a member, if the member is present
    pub fn get(&self, member: &str) -> Option<Value> {
        self.0.members.read().get(member).cloned()
    }

    /// Current value of a member, `Null` when absent
    pub fn get_or_null(&self, member: &str) -> Value {
        self.get(member).unwrap_or(Value::Null)
    }

    /// Whether the member is present on this instance
    pub fn has_member(&self, member: &str) -> bool {
        self.0.members.read().contains_key(member)
    }

    /// Names of the members present on this instance
    pub fn member_names(&self) -> Vec<String> {
        self.0.members.read().keys().cloned().collect()
    }

    /// Write a member and notify subscribers
    pub fn set(&self, member: &str, value: impl Into<Value>) {
        self.0
            .members
            .write()
            .insert(member.to_string(), value.into());
        self.notify(member);
    }

    /// Write a member only if the new value differs from the current one
    ///
    /// Returns true when the member was written (and subscribers notified).
    pub fn set_if_changed(&self, member: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        {
            let mut members = self.0.members.write();
            if members.get(member) == Some(&value) {
                return false;
            }
            members.insert(member.to_string(), value);
        }
        self.notify(member);
        true
    }

    /// Run `f` against the member map without raising notifications
    ///
    /// Used for in-place collection edits, which do not replace the member value.
    pub fn modify<R>(&self, f: impl FnOnce(&mut BTreeMap<String, Value>) -> R) -> R {
        f(&mut self.0.members.write())
    }

    /// Copy of every member, associations included
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.0.members.read().clone()
    }

    /// Copy of every non-association member
    pub fn data_snapshot(&self) -> BTreeMap<String, Value> {
        self.0
            .members
            .read()
            .iter()
            .filter(|(_, v)| !v.is_association())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// New instance with a copy of this instance's members
    ///
    /// Association links are copied as links. Subscribers are not copied.
    pub fn deep_clone(&self) -> Entity {
        Entity::from_members(self.0.type_name.clone(), self.snapshot())
    }

    /// Non-owning link to this instance
    pub fn link(&self) -> EntityLink {
        EntityLink(Arc::downgrade(&self.0))
    }

    /// Whether both handles point to the same instance
    pub fn same_instance(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the instance, for logging
    pub fn instance_id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Subscribe to property-changed notifications
    pub fn subscribe(&self, handler: impl Fn(&Entity, &str) + Send + Sync + 'static) {
        self.0.handlers.lock().push(Arc::new(handler));
    }

    /// Raise a property-changed notification for `member`
    pub fn notify(&self, member: &str) {
        let handlers: Vec<PropertyChangedHandler> = self.0.handlers.lock().clone();
        for handler in handlers {
            handler(self, member);
        }
    }

    /// Data members equal, ignoring identity and associations
    pub fn data_eq(&self, other: &Entity) -> bool {
        self.type_name() == other.type_name() && self.data_snapshot() == other.data_snapshot()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instance_id().hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.0.type_name)
            .field("members", &*self.0.members.read())
            .finish()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let members = self.data_snapshot();
        let mut map = serializer.serialize_map(Some(members.len() + 1))?;
        map.serialize_entry(TYPE_KEY, self.0.type_name.as_str())?;
        for (name, value) in &members {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(EntityVisitor)
    }
}

struct EntityVisitor;

impl<'de> Visitor<'de> for EntityVisitor {
    type Value = Entity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a map with a {} entry", TYPE_KEY)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Entity, A::Error> {
        let mut type_name: Option<String> = None;
        let mut members = BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            if key == TYPE_KEY {
                type_name = Some(map.next_value()?);
            } else {
                let value: Value = map.next_value()?;
                members.insert(key, value);
            }
        }
        let type_name = type_name.ok_or_else(|| A::Error::missing_field(TYPE_KEY))?;
        Ok(Entity::from_members(type_name, members))
    }
}

/// Non-owning reference to an entity, held by association members
#[derive(Clone)]
pub struct EntityLink(Weak<EntityInner>);

impl EntityLink {
    /// Resolve the link, `None` if the target was dropped
    pub fn upgrade(&self) -> Option<Entity> {
        self.0.upgrade().map(Entity)
    }

    /// Whether this link targets `entity`
    pub fn points_to(&self, entity: &Entity) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&entity.0))
    }
}

impl PartialEq for EntityLink {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EntityLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(e) => write!(f, "EntityLink({}@{:#x})", e.type_name(), e.instance_id()),
            None => f.write_str("EntityLink(<dropped>)"),
        }
    }
}
