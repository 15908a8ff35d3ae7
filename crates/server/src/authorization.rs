//! Authorization
//!
//! An [`AuthorizationContext`] describes one authorization check: the entity
//! being acted on, the operation, and the services and items available to
//! the rules. A *template* context carries only services and items; it is
//! created once per service and every check derives a *live* context from it.
//!
//! ## Scoping
//!
//! A context lazily owns a local [`ServiceContainer`] in which rules may
//! register check-scoped services. The container is released by
//! [`AuthorizationContext::dispose`] or when the context is dropped.

use crate::description::OperationDescription;
use crate::principal::Principal;
use crate::services::{ServiceContainer, ServiceProvider, SharedService};
use parking_lot::Mutex;
use ria_core::{DomainOperation, Entity, Error, Result, Value};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Items shared between the rules of one check
pub type ContextItems = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
struct LiveState {
    instance: Option<Entity>,
    operation: String,
    operation_type: DomainOperation,
}

/// Context of one authorization check
pub struct AuthorizationContext {
    live: Option<LiveState>,
    provider: Option<Arc<dyn ServiceProvider>>,
    items: Arc<ContextItems>,
    container: Mutex<Option<Arc<ServiceContainer>>>,
}

impl AuthorizationContext {
    /// Template context holding only services
    pub fn template(provider: Option<Arc<dyn ServiceProvider>>) -> Self {
        Self::with_items(provider, ContextItems::new())
    }

    /// Template context holding services and items
    pub fn with_items(provider: Option<Arc<dyn ServiceProvider>>, items: ContextItems) -> Self {
        Self {
            live: None,
            provider,
            items: Arc::new(items),
            container: Mutex::new(None),
        }
    }

    /// Live context for a check on `instance`
    pub fn new(
        instance: Option<Entity>,
        operation: impl Into<String>,
        operation_type: DomainOperation,
        provider: Option<Arc<dyn ServiceProvider>>,
        items: ContextItems,
    ) -> Self {
        Self {
            live: Some(LiveState {
                instance,
                operation: operation.into(),
                operation_type,
            }),
            provider,
            items: Arc::new(items),
            container: Mutex::new(None),
        }
    }

    /// Live context derived from this one
    ///
    /// The derived context sees a snapshot of this context's items and looks
    /// up services through this context's container (if materialized) and
    /// provider chain.
    pub fn derive(
        &self,
        instance: Option<Entity>,
        operation: impl Into<String>,
        operation_type: DomainOperation,
    ) -> Self {
        let provider = match self.container.lock().as_ref() {
            Some(container) => Some(Arc::clone(container) as Arc<dyn ServiceProvider>),
            None => self.provider.clone(),
        };
        Self {
            live: Some(LiveState {
                instance,
                operation: operation.into(),
                operation_type,
            }),
            provider,
            items: Arc::clone(&self.items),
            container: Mutex::new(None),
        }
    }

    /// Whether this is a template context
    pub fn is_template(&self) -> bool {
        self.live.is_none()
    }

    fn live(&self, accessor: &str) -> Result<&LiveState> {
        self.live.as_ref().ok_or_else(|| {
            Error::invalid_operation(format!(
                "{} is not available on a template authorization context",
                accessor
            ))
        })
    }

    /// Entity being authorized, `None` for queries and invokes
    pub fn instance(&self) -> Result<Option<&Entity>> {
        Ok(self.live("instance")?.instance.as_ref())
    }

    /// Operation name
    pub fn operation(&self) -> Result<&str> {
        Ok(&self.live("operation")?.operation)
    }

    /// Operation kind
    pub fn operation_type(&self) -> Result<DomainOperation> {
        Ok(self.live("operation_type")?.operation_type)
    }

    /// Items snapshot taken at construction
    pub fn items(&self) -> &ContextItems {
        &self.items
    }

    /// Local service container, created on first use
    pub fn service_container(&self) -> Arc<ServiceContainer> {
        let mut slot = self.container.lock();
        let container = slot.get_or_insert_with(|| Arc::new(ServiceContainer::with_parent(self.provider.clone())));
        Arc::clone(container)
    }

    /// Typed service lookup: local container, then the provider chain
    ///
    /// Asking for [`ServiceContainer`] returns the local container, creating it.
    pub fn get_service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_service_any(TypeId::of::<T>())
            .and_then(|s| s.downcast::<T>().ok())
    }

    /// Release the local container; calling it again has no effect
    pub fn dispose(&self) {
        self.container.lock().take();
    }

    /// Evaluate `rules` for `principal`; the first denial wins
    pub fn authorize(&self, principal: &Principal, rules: &[Arc<dyn AuthorizationRule>]) -> AuthorizationResult {
        rules
            .iter()
            .map(|rule| rule.authorize(principal, self))
            .find(|r| !r.is_allowed())
            .unwrap_or(AuthorizationResult::Allowed)
    }
}

impl ServiceProvider for AuthorizationContext {
    fn get_service_any(&self, type_id: TypeId) -> Option<SharedService> {
        if type_id == TypeId::of::<ServiceContainer>() {
            return Some(self.service_container() as SharedService);
        }
        let local = self.container.lock().clone();
        if let Some(found) = local.and_then(|c| c.get_service_any(type_id)) {
            return Some(found);
        }
        self.provider.as_ref().and_then(|p| p.get_service_any(type_id))
    }
}

impl Drop for AuthorizationContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for AuthorizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationContext")
            .field("live", &self.live)
            .field("items", &self.items.len())
            .field("has_container", &self.container.lock().is_some())
            .finish()
    }
}

/// Outcome of an authorization rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResult {
    /// The operation may run
    Allowed,
    /// The operation is denied, with the reason shown to the caller
    Denied(String),
}

impl AuthorizationResult {
    /// Whether the operation may run
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationResult::Allowed)
    }
}

/// A check run before an operation executes
pub trait AuthorizationRule: Send + Sync {
    /// Decide whether `principal` may run the operation described by `context`
    fn authorize(&self, principal: &Principal, context: &AuthorizationContext) -> AuthorizationResult;
}

impl<F> AuthorizationRule for F
where
    F: Fn(&Principal, &AuthorizationContext) -> AuthorizationResult + Send + Sync,
{
    fn authorize(&self, principal: &Principal, context: &AuthorizationContext) -> AuthorizationResult {
        self(principal, context)
    }
}

/// Denies unauthenticated callers
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiresAuthentication;

impl AuthorizationRule for RequiresAuthentication {
    fn authorize(&self, principal: &Principal, _: &AuthorizationContext) -> AuthorizationResult {
        if principal.is_authenticated() {
            AuthorizationResult::Allowed
        } else {
            AuthorizationResult::Denied("Access to operation is denied: authentication is required.".into())
        }
    }
}

/// Denies callers holding none of the roles
#[derive(Debug, Clone)]
pub struct RequiresRole {
    roles: Vec<String>,
}

impl RequiresRole {
    /// Rule requiring any one of `roles`
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

impl AuthorizationRule for RequiresRole {
    fn authorize(&self, principal: &Principal, _: &AuthorizationContext) -> AuthorizationResult {
        if principal.is_authenticated() && self.roles.iter().any(|r| principal.is_in_role(r)) {
            AuthorizationResult::Allowed
        } else {
            AuthorizationResult::Denied(format!(
                "Access to operation is denied: one of the roles [{}] is required.",
                self.roles.join(", ")
            ))
        }
    }
}

/// Check service-wide rules, then the operation's own rules
///
/// A denial becomes [`Error::Unauthorized`] naming the operation.
pub(crate) fn ensure_authorized(
    context: &AuthorizationContext,
    principal: &Principal,
    service_rules: &[Arc<dyn AuthorizationRule>],
    operation: &OperationDescription,
) -> Result<()> {
    let mut result = context.authorize(principal, service_rules);
    if result.is_allowed() {
        result = context.authorize(principal, operation.rules());
    }
    match result {
        AuthorizationResult::Allowed => Ok(()),
        AuthorizationResult::Denied(reason) => {
            warn!(
                target: "ria::authorization",
                operation = operation.name(),
                user = principal.name(),
                %reason,
                "Authorization denied"
            );
            Err(Error::unauthorized(operation.name(), reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct AuditLog(&'static str);

    fn provider() -> Arc<dyn ServiceProvider> {
        let c = ServiceContainer::new();
        c.add(AuditLog("root"));
        Arc::new(c)
    }

    #[test]
    fn test_template_accessors_fail() {
        let ctx = AuthorizationContext::template(Some(provider()));
        assert!(ctx.is_template());
        assert!(matches!(ctx.operation(), Err(Error::InvalidOperation { .. })));
        assert!(ctx.instance().is_err());
        assert!(ctx.operation_type().is_err());
        // Services remain reachable on a template
        assert_eq!(*ctx.get_service::<AuditLog>().unwrap(), AuditLog("root"));
    }

    #[test]
    fn test_live_accessors() {
        let e = Entity::new("Customer");
        let ctx = AuthorizationContext::new(
            Some(e.clone()),
            "UpdateCustomer",
            DomainOperation::Update,
            None,
            ContextItems::new(),
        );
        assert_eq!(ctx.operation().unwrap(), "UpdateCustomer");
        assert_eq!(ctx.operation_type().unwrap(), DomainOperation::Update);
        assert!(ctx.instance().unwrap().unwrap().same_instance(&e));
    }

    #[test]
    fn test_derive_snapshots_items_and_chains_services() {
        let mut items = ContextItems::new();
        items.insert("tenant".into(), Value::from("contoso"));
        let template = AuthorizationContext::with_items(Some(provider()), items);
        template.service_container().add(7u32);

        let live = template.derive(None, "GetCustomers", DomainOperation::Query);
        assert_eq!(live.items()["tenant"], Value::from("contoso"));
        assert_eq!(*live.get_service::<u32>().unwrap(), 7);
        assert_eq!(*live.get_service::<AuditLog>().unwrap(), AuditLog("root"));
    }

    #[test]
    fn test_container_materializes_and_dispose_is_idempotent() {
        let ctx = AuthorizationContext::template(None);
        let container = ctx.get_service::<ServiceContainer>().unwrap();
        container.add(1u8);
        assert_eq!(*ctx.get_service::<u8>().unwrap(), 1);

        ctx.dispose();
        ctx.dispose();
        assert!(ctx.get_service::<u8>().is_none());
    }

    #[test]
    fn test_first_denial_wins() {
        let ctx = AuthorizationContext::template(None).derive(None, "Op", DomainOperation::Invoke);
        let rules: Vec<Arc<dyn AuthorizationRule>> = vec![
            Arc::new(RequiresAuthentication),
            Arc::new(RequiresRole::new(["Admin"])),
        ];
        let anon = ctx.authorize(&Principal::anonymous(), &rules);
        assert!(matches!(anon, AuthorizationResult::Denied(m) if m.contains("authentication")));

        let user = ctx.authorize(&Principal::authenticated("bob"), &rules);
        assert!(matches!(user, AuthorizationResult::Denied(m) if m.contains("Admin")));

        let admin = Principal::authenticated("ann").with_role("Admin");
        assert!(ctx.authorize(&admin, &rules).is_allowed());
    }

    #[test]
    fn test_closure_rule_sees_context() {
        let rule = |_: &Principal, ctx: &AuthorizationContext| match ctx.operation() {
            Ok("DeleteCustomer") => AuthorizationResult::Denied("no deletes".into()),
            _ => AuthorizationResult::Allowed,
        };
        let rules: Vec<Arc<dyn AuthorizationRule>> = vec![Arc::new(rule)];
        let t = AuthorizationContext::template(None);
        let p = Principal::anonymous();
        assert!(!t.derive(None, "DeleteCustomer", DomainOperation::Delete).authorize(&p, &rules).is_allowed());
        assert!(t.derive(None, "UpdateCustomer", DomainOperation::Update).authorize(&p, &rules).is_allowed());
    }
}
