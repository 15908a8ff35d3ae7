//! Service lookup
//!
//! Authorization rules, validation rules, and domain operations look up
//! collaborators by type through a [`ServiceProvider`]. A [`ServiceContainer`]
//! is the concrete provider: a type-keyed map with an optional parent that is
//! consulted on a miss.

use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased service instance
pub type SharedService = Arc<dyn Any + Send + Sync>;

/// Source of services, looked up by type
pub trait ServiceProvider: Send + Sync {
    /// Service registered for `type_id`
    fn get_service_any(&self, type_id: TypeId) -> Option<SharedService>;
}

impl dyn ServiceProvider {
    /// Typed lookup
    pub fn get_service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_service_any(TypeId::of::<T>())
            .and_then(|s| s.downcast::<T>().ok())
    }
}

/// Type-keyed service map with parent fallback
#[derive(Default)]
pub struct ServiceContainer {
    services: DashMap<TypeId, SharedService>,
    parent: Option<Arc<dyn ServiceProvider>>,
}

impl ServiceContainer {
    /// Create an empty container without a parent
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty container that falls back to `parent`
    pub fn with_parent(parent: Option<Arc<dyn ServiceProvider>>) -> Self {
        Self {
            services: DashMap::new(),
            parent,
        }
    }

    /// Register `service` under its own type, replacing any previous one
    pub fn add<T: Any + Send + Sync>(&self, service: T) {
        self.add_shared(Arc::new(service));
    }

    /// Register an already shared service under its type
    pub fn add_shared<T: Any + Send + Sync>(&self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service as SharedService);
    }

    /// Remove the service registered for `T`, if any
    pub fn remove<T: Any + Send + Sync>(&self) -> bool {
        self.services.remove(&TypeId::of::<T>()).is_some()
    }

    /// Typed lookup, falling back to the parent
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_service_any(TypeId::of::<T>())
            .and_then(|s| s.downcast::<T>().ok())
    }

    /// Number of services registered locally
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no service is registered locally
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceProvider for ServiceContainer {
    fn get_service_any(&self, type_id: TypeId) -> Option<SharedService> {
        if let Some(local) = self.services.get(&type_id) {
            return Some(local.value().clone());
        }
        self.parent.as_ref().and_then(|p| p.get_service_any(type_id))
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("services", &self.services.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
