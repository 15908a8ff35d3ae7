//! Operation tables
//!
//! A [`DomainServiceDescription`] lists the operations a domain service
//! exposes and the authorization rules guarding them. It is built once per
//! service type and shared between requests.
//!
//! | Operation | Keyed by |
//! |-----------|----------|
//! | Insert / Update / Delete | entity type and operation kind |
//! | Entity action (`Custom`) | entity type and action name |
//! | Query / Invoke | operation name |

use crate::authorization::AuthorizationRule;
use crate::service::DomainError;
use ria_core::{DomainOperation, Entity, Error, Result, TypeName, Value};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Insert, update, or delete handler
pub type CudHandler<S> = Box<dyn Fn(&mut S, &Entity) -> std::result::Result<(), DomainError> + Send + Sync>;
/// Entity action handler
pub type ActionHandler<S> =
    Box<dyn Fn(&mut S, &Entity, &[Value]) -> std::result::Result<(), DomainError> + Send + Sync>;
/// Query handler
pub type QueryHandler<S> = Box<dyn Fn(&mut S, &[Value]) -> std::result::Result<Vec<Entity>, DomainError> + Send + Sync>;
/// Invoke handler
pub type InvokeHandler<S> = Box<dyn Fn(&mut S, &[Value]) -> std::result::Result<Value, DomainError> + Send + Sync>;

/// Name, kind, and authorization rules of one operation
#[derive(Clone)]
pub struct OperationDescription {
    name: String,
    kind: DomainOperation,
    rules: Vec<Arc<dyn AuthorizationRule>>,
}

impl OperationDescription {
    fn new(name: String, kind: DomainOperation) -> Self {
        Self {
            name,
            kind,
            rules: Vec::new(),
        }
    }

    /// Guard the operation with `rule`
    pub fn require(&mut self, rule: impl AuthorizationRule + 'static) -> &mut Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Operation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operation kind
    pub fn kind(&self) -> DomainOperation {
        self.kind
    }

    /// Rules guarding this operation
    pub fn rules(&self) -> &[Arc<dyn AuthorizationRule>] {
        &self.rules
    }
}

impl fmt::Debug for OperationDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescription")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// A registered operation
pub struct Operation<H> {
    description: OperationDescription,
    handler: H,
}

impl<H> Operation<H> {
    /// Name, kind, and rules
    pub fn description(&self) -> &OperationDescription {
        &self.description
    }

    /// The handler
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

/// Operation table of a domain service type `S`
pub struct DomainServiceDescription<S> {
    name: String,
    cud: FxHashMap<(TypeName, DomainOperation), Operation<CudHandler<S>>>,
    actions: FxHashMap<(TypeName, String), Operation<ActionHandler<S>>>,
    queries: FxHashMap<String, Operation<QueryHandler<S>>>,
    invokes: FxHashMap<String, Operation<InvokeHandler<S>>>,
    rules: Vec<Arc<dyn AuthorizationRule>>,
}

impl<S> DomainServiceDescription<S> {
    /// Empty table for the service called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cud: FxHashMap::default(),
            actions: FxHashMap::default(),
            queries: FxHashMap::default(),
            invokes: FxHashMap::default(),
            rules: Vec::new(),
        }
    }

    /// Service name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Guard every operation of the service with `rule`
    pub fn require(&mut self, rule: impl AuthorizationRule + 'static) -> &mut Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Service-wide rules
    pub fn rules(&self) -> &[Arc<dyn AuthorizationRule>] {
        &self.rules
    }

    /// Register an insert, update, or delete handler for `entity_type`
    ///
    /// The operation is named after its kind and type (`InsertCustomer`).
    pub fn add_cud(
        &mut self,
        entity_type: impl Into<TypeName>,
        kind: DomainOperation,
        handler: impl Fn(&mut S, &Entity) -> std::result::Result<(), DomainError> + Send + Sync + 'static,
    ) -> Result<&mut OperationDescription> {
        if !kind.is_cud() {
            return Err(Error::invalid_operation(format!("{} is not an insert, update or delete", kind)));
        }
        let entity_type = entity_type.into();
        let name = format!("{}{}", kind, entity_type);
        let handler: CudHandler<S> = Box::new(handler);
        let slot = insert_unique(&mut self.cud, (entity_type, kind), name, kind, handler)?;
        Ok(&mut slot.description)
    }

    /// Register an insert handler
    pub fn add_insert(
        &mut self,
        entity_type: impl Into<TypeName>,
        handler: impl Fn(&mut S, &Entity) -> std::result::Result<(), DomainError> + Send + Sync + 'static,
    ) -> Result<&mut OperationDescription> {
        self.add_cud(entity_type, DomainOperation::Insert, handler)
    }

    /// Register an update handler
    pub fn add_update(
        &mut self,
        entity_type: impl Into<TypeName>,
        handler: impl Fn(&mut S, &Entity) -> std::result::Result<(), DomainError> + Send + Sync + 'static,
    ) -> Result<&mut OperationDescription> {
        self.add_cud(entity_type, DomainOperation::Update, handler)
    }

    /// Register a delete handler
    pub fn add_delete(
        &mut self,
        entity_type: impl Into<TypeName>,
        handler: impl Fn(&mut S, &Entity) -> std::result::Result<(), DomainError> + Send + Sync + 'static,
    ) -> Result<&mut OperationDescription> {
        self.add_cud(entity_type, DomainOperation::Delete, handler)
    }

    /// Register an entity action on `entity_type`
    pub fn add_action(
        &mut self,
        entity_type: impl Into<TypeName>,
        name: impl Into<String>,
        handler: impl Fn(&mut S, &Entity, &[Value]) -> std::result::Result<(), DomainError> + Send + Sync + 'static,
    ) -> Result<&mut OperationDescription> {
        let name = name.into();
        let handler: ActionHandler<S> = Box::new(handler);
        let slot = insert_unique(
            &mut self.actions,
            (entity_type.into(), name.clone()),
            name,
            DomainOperation::Custom,
            handler,
        )?;
        Ok(&mut slot.description)
    }

    /// Register a query
    pub fn add_query(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut S, &[Value]) -> std::result::Result<Vec<Entity>, DomainError> + Send + Sync + 'static,
    ) -> Result<&mut OperationDescription> {
        let name = name.into();
        let handler: QueryHandler<S> = Box::new(handler);
        let slot = insert_unique(&mut self.queries, name.clone(), name, DomainOperation::Query, handler)?;
        Ok(&mut slot.description)
    }

    /// Register an invoke operation
    pub fn add_invoke(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&mut S, &[Value]) -> std::result::Result<Value, DomainError> + Send + Sync + 'static,
    ) -> Result<&mut OperationDescription> {
        let name = name.into();
        let handler: InvokeHandler<S> = Box::new(handler);
        let slot = insert_unique(&mut self.invokes, name.clone(), name, DomainOperation::Invoke, handler)?;
        Ok(&mut slot.description)
    }

    /// Insert, update, or delete operation for an entity type
    pub fn cud_operation(&self, entity_type: &TypeName, kind: DomainOperation) -> Option<&Operation<CudHandler<S>>> {
        self.cud.get(&(entity_type.clone(), kind))
    }

    /// Entity action on an entity type
    pub fn action(&self, entity_type: &TypeName, name: &str) -> Option<&Operation<ActionHandler<S>>> {
        self.actions.get(&(entity_type.clone(), name.to_string()))
    }

    /// Query by name
    pub fn query(&self, name: &str) -> Option<&Operation<QueryHandler<S>>> {
        self.queries.get(name)
    }

    /// Invoke operation by name
    pub fn invoke(&self, name: &str) -> Option<&Operation<InvokeHandler<S>>> {
        self.invokes.get(name)
    }

    /// Total number of registered operations
    pub fn operation_count(&self) -> usize {
        self.cud.len() + self.actions.len() + self.queries.len() + self.invokes.len()
    }
}

fn insert_unique<K, H>(
    table: &mut FxHashMap<K, Operation<H>>,
    key: K,
    name: String,
    kind: DomainOperation,
    handler: H,
) -> Result<&mut Operation<H>>
where
    K: std::hash::Hash + Eq,
{
    use std::collections::hash_map::Entry;
    match table.entry(key) {
        Entry::Occupied(_) => Err(Error::invalid_operation(format!(
            "operation {} is already registered",
            name
        ))),
        Entry::Vacant(slot) => Ok(slot.insert(Operation {
            description: OperationDescription::new(name, kind),
            handler,
        })),
    }
}

impl<S> fmt::Debug for DomainServiceDescription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainServiceDescription")
            .field("name", &self.name)
            .field("operations", &self.operation_count())
            .field("rules", &self.rules.len())
            .finish()
    }
}
