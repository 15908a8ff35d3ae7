//! Change-set submission
//!
//! Runs a reconciled change set through a domain service:
//!
//! 1. **Authorize** every CUD entry and entity action. A denial or a missing
//!    operation aborts the submit.
//! 2. **Validate** inserted and updated entities and action parameters.
//!    Errors are attached to the entries; if any entry failed, nothing runs.
//! 3. **Execute** CUD operations in entry order, then entity actions.
//!    Validation errors raised by the service stay on their entry and the
//!    batch continues; any other failure aborts.
//! 4. **Persist**, resolving conflicts once if the service records any.

use crate::authorization::{ensure_authorized, AuthorizationContext};
use crate::service::{DomainError, DomainService};
use crate::validation::{ValidationContext, Validator};
use ria_changeset::{ChangeSet, EntityActionInvocation};
use ria_core::{DomainOperation, Error, Result};
use ria_metadata::MetaTypeRegistry;
use tracing::{debug, error};

/// Submit `change_set` to `service`
///
/// Returns `Ok(true)` when every entry went through without errors,
/// `Ok(false)` when errors or conflicts were recorded on the entries.
///
/// # Errors
///
/// [`Error::OperationNotFound`] and [`Error::Unauthorized`] from
/// authorization, [`Error::Domain`] for operation failures, and metadata
/// errors from validation.
pub fn submit<S: DomainService>(service: &mut S, change_set: &mut ChangeSet, registry: &MetaTypeRegistry) -> Result<bool> {
    authorize_change_set(service, change_set)?;

    if !validate_change_set(service, change_set, registry)? {
        debug!(target: "ria::submit", "Validation failed, nothing executed");
        return Ok(false);
    }

    execute_change_set(service, change_set)?;
    if change_set.has_error() {
        return Ok(false);
    }

    persist_change_set(service, change_set)?;
    Ok(!change_set.has_error())
}

fn authorize_change_set<S: DomainService>(service: &S, change_set: &ChangeSet) -> Result<()> {
    let description = service.description();
    let context = service.context();
    let template = AuthorizationContext::template(context.provider().cloned());

    for entry in change_set.entries() {
        let type_name = entry.entity.type_name();
        if entry.operation.is_cud() {
            let operation = description
                .cud_operation(type_name, entry.operation)
                .ok_or_else(|| Error::operation_not_found(format!("{}{}", entry.operation, type_name)))?;
            let check = template.derive(
                Some(entry.entity.clone()),
                operation.description().name(),
                entry.operation,
            );
            ensure_authorized(&check, context.principal(), description.rules(), operation.description())?;
        }

        for action in entry.entity_actions.iter().flatten() {
            let operation = description
                .action(type_name, &action.name)
                .ok_or_else(|| Error::operation_not_found(format!("{}.{}", type_name, action.name)))?;
            let check = template.derive(Some(entry.entity.clone()), &action.name, DomainOperation::Custom);
            ensure_authorized(&check, context.principal(), description.rules(), operation.description())?;
        }
    }
    Ok(())
}

fn validate_change_set<S: DomainService>(
    service: &S,
    change_set: &mut ChangeSet,
    registry: &MetaTypeRegistry,
) -> Result<bool> {
    let validator = Validator::new(registry);
    let provider = service.context().provider().cloned();

    for entry in change_set.entries_mut() {
        if matches!(entry.operation, DomainOperation::Insert | DomainOperation::Update) {
            let context = ValidationContext::for_entity(&entry.entity, provider.clone());
            let errors = validator.validate_entity(&entry.entity, &context)?;
            entry.add_validation_errors(errors);
        }

        let actions = entry.entity_actions.clone().unwrap_or_default();
        if actions.is_empty() {
            continue;
        }
        let meta = registry.get_meta_type(entry.entity.type_name())?;
        for action in &actions {
            let Some(declared) = meta.custom_action(&action.name) else {
                continue;
            };
            if declared.parameters.len() != action.parameters.len() {
                return Err(Error::invalid_change_set(format!(
                    "entry {} action {} expects {} parameters, got {}",
                    entry.id,
                    action.name,
                    declared.parameters.len(),
                    action.parameters.len()
                )));
            }
            let context = ValidationContext::for_entity(&entry.entity, provider.clone());
            let errors = validator.validate_parameters(declared, &action.parameters, &context);
            entry.add_validation_errors(errors);
        }
    }

    Ok(!change_set.has_error())
}

fn execute_change_set<S: DomainService>(service: &mut S, change_set: &mut ChangeSet) -> Result<()> {
    let description = service.description();

    for index in 0..change_set.len() {
        let entry = &change_set.entries()[index];
        if !entry.operation.is_cud() {
            continue;
        }
        let entity = entry.entity.clone();
        let operation = description
            .cud_operation(entity.type_name(), entry.operation)
            .ok_or_else(|| Error::operation_not_found(format!("{}{}", entry.operation, entity.type_name())))?;

        let outcome = (operation.handler())(service, &entity);
        record_outcome(service, change_set, index, operation.description().name(), outcome)?;
    }

    for index in 0..change_set.len() {
        let entry = &change_set.entries()[index];
        let entity = entry.entity.clone();
        let actions: Vec<EntityActionInvocation> = entry.entity_actions.clone().unwrap_or_default();

        for action in actions {
            let operation = description
                .action(entity.type_name(), &action.name)
                .ok_or_else(|| Error::operation_not_found(format!("{}.{}", entity.type_name(), action.name)))?;
            let outcome = (operation.handler())(service, &entity, &action.parameters);
            record_outcome(service, change_set, index, &action.name, outcome)?;
        }
    }
    Ok(())
}

fn record_outcome<S: DomainService>(
    service: &mut S,
    change_set: &mut ChangeSet,
    index: usize,
    operation: &str,
    outcome: std::result::Result<(), DomainError>,
) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(DomainError::Validation(errors)) => {
            let entry = &mut change_set.entries_mut()[index];
            debug!(
                target: "ria::submit",
                entry = entry.id,
                operation,
                errors = errors.len(),
                "Operation reported validation errors"
            );
            entry.add_validation_errors(errors);
            Ok(())
        }
        Err(failure) => Err(abort(service, operation, failure)),
    }
}

fn persist_change_set<S: DomainService>(service: &mut S, change_set: &mut ChangeSet) -> Result<()> {
    let persisted = match service.persist_change_set(change_set) {
        Ok(persisted) => persisted,
        Err(failure) => return Err(abort(service, "PersistChangeSet", failure)),
    };

    if !persisted || change_set.has_conflicts() {
        debug!(target: "ria::submit", "Conflicts recorded, resolving");
        if service.resolve_change_set(change_set) {
            if let Err(failure) = service.persist_change_set(change_set) {
                return Err(abort(service, "PersistChangeSet", failure));
            }
        }
    }
    Ok(())
}

fn abort<S: DomainService>(service: &mut S, operation: &str, failure: DomainError) -> Error {
    error!(target: "ria::submit", operation, error = %failure, "Domain operation failed");
    service.on_error(&failure);
    Error::domain(operation, failure.to_string())
}
