//! Query and invoke dispatch

use crate::authorization::{ensure_authorized, AuthorizationContext};
use crate::principal::Principal;
use crate::service::{DomainError, DomainService};
use ria_changeset::ValidationResultInfo;
use ria_core::{DomainOperation, Entity, Error, Result, Value};
use ria_metadata::MetaTypeRegistry;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::{debug, error};

/// Paging and counting options of a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Report the number of results before paging
    pub include_total_count: bool,
    /// Root results to skip
    pub skip: Option<usize>,
    /// Maximum number of root results
    pub take: Option<usize>,
}

/// Outcome of a query
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Entities returned by the query, after paging
    pub root_results: Vec<Entity>,
    /// Entities reachable from the roots through include associations
    pub included_results: Vec<Entity>,
    /// Root count before paging, when requested
    pub total_count: Option<usize>,
    /// Validation errors reported by the query
    pub validation_errors: Vec<ValidationResultInfo>,
}

/// Outcome of an invoke operation
#[derive(Debug, Clone, Default)]
pub struct InvokeResult {
    /// Value returned by the operation
    pub return_value: Value,
    /// Validation errors reported by the operation
    pub validation_errors: Vec<ValidationResultInfo>,
}

/// Run the query `name` on `service`
///
/// A [`DomainError::Validation`] from the query is reported in the result;
/// any other failure aborts with [`Error::Domain`].
pub fn query<S: DomainService>(
    service: &mut S,
    name: &str,
    parameters: &[Value],
    options: QueryOptions,
    registry: &MetaTypeRegistry,
) -> Result<QueryResult> {
    let description = service.description();
    let operation = description
        .query(name)
        .ok_or_else(|| Error::operation_not_found(name))?;
    authorize(service, operation.description().name(), DomainOperation::Query, |check, principal| {
        ensure_authorized(check, principal, description.rules(), operation.description())
    })?;

    let entities = match (operation.handler())(service, parameters) {
        Ok(entities) => entities,
        Err(DomainError::Validation(errors)) => {
            return Ok(QueryResult {
                validation_errors: errors,
                ..QueryResult::default()
            });
        }
        Err(failure) => return Err(abort(service, name, failure)),
    };

    let total_count = options.include_total_count.then_some(entities.len());
    let root_results: Vec<Entity> = entities
        .into_iter()
        .skip(options.skip.unwrap_or(0))
        .take(options.take.unwrap_or(usize::MAX))
        .collect();
    let included_results = gather_included(&root_results, registry)?;

    debug!(
        target: "ria::query",
        query = name,
        roots = root_results.len(),
        included = included_results.len(),
        "Query completed"
    );
    Ok(QueryResult {
        root_results,
        included_results,
        total_count,
        validation_errors: Vec::new(),
    })
}

/// Run the invoke operation `name` on `service`
pub fn invoke<S: DomainService>(service: &mut S, name: &str, parameters: &[Value]) -> Result<InvokeResult> {
    let description = service.description();
    let operation = description
        .invoke(name)
        .ok_or_else(|| Error::operation_not_found(name))?;
    authorize(service, operation.description().name(), DomainOperation::Invoke, |check, principal| {
        ensure_authorized(check, principal, description.rules(), operation.description())
    })?;

    match (operation.handler())(service, parameters) {
        Ok(return_value) => Ok(InvokeResult {
            return_value,
            validation_errors: Vec::new(),
        }),
        Err(DomainError::Validation(errors)) => Ok(InvokeResult {
            return_value: Value::Null,
            validation_errors: errors,
        }),
        Err(failure) => Err(abort(service, name, failure)),
    }
}

fn authorize<S: DomainService>(
    service: &S,
    operation: &str,
    kind: DomainOperation,
    check: impl FnOnce(&AuthorizationContext, &Principal) -> Result<()>,
) -> Result<()> {
    let context = service.context();
    let template = AuthorizationContext::template(context.provider().cloned());
    let live = template.derive(None, operation, kind);
    check(&live, context.principal())
}

/// Entities reachable from `roots` through include associations, roots excluded
fn gather_included(roots: &[Entity], registry: &MetaTypeRegistry) -> Result<Vec<Entity>> {
    let mut seen: FxHashSet<usize> = roots.iter().map(Entity::instance_id).collect();
    let mut pending: VecDeque<Entity> = roots.iter().cloned().collect();
    let mut included = Vec::new();

    while let Some(entity) = pending.pop_front() {
        let meta = registry.get_meta_type(entity.type_name())?;
        for member in meta.association_members().iter().filter(|m| m.is_include()) {
            let Some(related) = member.get_value(&entity).and_then(|v| v.as_entities()) else {
                continue;
            };
            for target in related {
                if seen.insert(target.instance_id()) {
                    included.push(target.clone());
                    pending.push_back(target);
                }
            }
        }
    }
    Ok(included)
}

fn abort<S: DomainService>(service: &mut S, operation: &str, failure: DomainError) -> Error {
    error!(target: "ria::query", operation, error = %failure, "Domain operation failed");
    service.on_error(&failure);
    Error::domain(operation, failure.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::RequiresRole;
    use crate::description::DomainServiceDescription;
    use crate::service::{DomainServiceContext, RequestKind};
    use ria_metadata::{AssociationDescriptor, MemberDescriptor, SchemaRegistry, TypeDescriptor};
    use std::sync::Arc;

    struct Catalog {
        context: DomainServiceContext,
        description: Arc<DomainServiceDescription<Catalog>>,
        customers: Vec<Entity>,
        _orders: Vec<Entity>,
        errors: usize,
    }

    impl DomainService for Catalog {
        fn context(&self) -> &DomainServiceContext {
            &self.context
        }

        fn description(&self) -> Arc<DomainServiceDescription<Self>> {
            Arc::clone(&self.description)
        }

        fn on_error(&mut self, _error: &DomainError) {
            self.errors += 1;
        }
    }

    fn catalog(principal: Principal) -> Catalog {
        let mut d = DomainServiceDescription::new("Catalog");
        d.add_query("GetCustomers", |s: &mut Catalog, _| Ok(s.customers.clone())).unwrap();
        d.add_query("Broken", |_, _| Err(DomainError::failed("store offline"))).unwrap();
        d.add_query("Picky", |_, _| Err(DomainError::validation("bad filter", ["Filter"])))
            .unwrap();
        d.add_invoke("Echo", |_, params| Ok(params.first().cloned().unwrap_or(Value::Null)))
            .unwrap()
            .require(RequiresRole::new(["Admin"]));

        let order = Entity::new("Order").with("Id", 10);
        let customers = (1..=3)
            .map(|id| {
                Entity::new("Customer")
                    .with("Id", id)
                    .with("Orders", Value::entity_set([&order]))
            })
            .collect();
        Catalog {
            context: DomainServiceContext::new(principal, RequestKind::Query),
            description: Arc::new(d),
            customers,
            _orders: vec![order],
            errors: 0,
        }
    }

    fn registry() -> MetaTypeRegistry {
        let schema = SchemaRegistry::build([
            TypeDescriptor::entity("Customer")
                .member(MemberDescriptor::int("Id").key())
                .member(
                    MemberDescriptor::entity_collection(
                        "Orders",
                        "Order",
                        AssociationDescriptor::new("Customer_Orders", &["Id"], &["CustomerId"]),
                    )
                    .include(),
                ),
            TypeDescriptor::entity("Order").member(MemberDescriptor::int("Id").key()),
        ])
        .unwrap();
        MetaTypeRegistry::new(Arc::new(schema))
    }

    #[test]
    fn test_query_paging_and_count() {
        let mut service = catalog(Principal::anonymous());
        let options = QueryOptions {
            include_total_count: true,
            skip: Some(1),
            take: Some(1),
        };
        let result = query(&mut service, "GetCustomers", &[], options, &registry()).unwrap();
        assert_eq!(result.total_count, Some(3));
        assert_eq!(result.root_results.len(), 1);
        assert_eq!(result.root_results[0].get("Id"), Some(Value::Int(2)));
    }

    #[test]
    fn test_query_included_results_deduplicated() {
        let mut service = catalog(Principal::anonymous());
        let result = query(&mut service, "GetCustomers", &[], QueryOptions::default(), &registry()).unwrap();
        assert_eq!(result.root_results.len(), 3);
        assert_eq!(result.included_results.len(), 1);
        assert_eq!(result.included_results[0].type_name().as_str(), "Order");
        assert_eq!(result.total_count, None);
    }

    #[test]
    fn test_query_errors() {
        let mut service = catalog(Principal::anonymous());
        let reg = registry();
        let err = query(&mut service, "Broken", &[], QueryOptions::default(), &reg).unwrap_err();
        assert!(matches!(err, Error::Domain { .. }));
        assert_eq!(service.errors, 1);

        let picky = query(&mut service, "Picky", &[], QueryOptions::default(), &reg).unwrap();
        assert!(picky.root_results.is_empty());
        assert_eq!(picky.validation_errors[0].message, "bad filter");

        let missing = query(&mut service, "Nope", &[], QueryOptions::default(), &reg).unwrap_err();
        assert!(matches!(missing, Error::OperationNotFound { .. }));
    }

    #[test]
    fn test_invoke_authorized() {
        let mut anon = catalog(Principal::anonymous());
        let err = invoke(&mut anon, "Echo", &[Value::from("hi")]).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));

        let mut admin = catalog(Principal::authenticated("root").with_role("Admin"));
        let result = invoke(&mut admin, "Echo", &[Value::from("hi")]).unwrap();
        assert_eq!(result.return_value, Value::from("hi"));
        assert!(result.validation_errors.is_empty());
    }
}
