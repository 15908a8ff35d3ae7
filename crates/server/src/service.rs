//! Domain services
//!
//! A domain service is the application's persistence and business logic. The
//! framework calls into it through the [`DomainService`] trait: operation
//! handlers come from its [`DomainServiceDescription`], and the change set is
//! persisted through [`DomainService::persist_change_set`].

use crate::description::DomainServiceDescription;
use crate::principal::Principal;
use crate::services::ServiceProvider;
use ria_changeset::{ChangeSet, ValidationResultInfo};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a domain operation
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Business validation failed; attached to the entry, the batch continues
    #[error("validation failed: {}", summary(.0))]
    Validation(Vec<ValidationResultInfo>),

    /// The operation failed; aborts the submit
    #[error("{message}")]
    Failed {
        /// What went wrong
        message: String,
    },
}

fn summary(errors: &[ValidationResultInfo]) -> String {
    errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}

impl DomainError {
    /// Single validation error on `members`
    pub fn validation<I, S>(message: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DomainError::Validation(vec![ValidationResultInfo::new(message, members)])
    }

    /// Operation failure
    pub fn failed(message: impl Into<String>) -> Self {
        DomainError::Failed {
            message: message.into(),
        }
    }
}

/// Kind of request a domain service is serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Entity query
    Query,
    /// Service-level invoke
    Invoke,
    /// Change-set submit
    Submit,
}

/// Per-request environment of a domain service
#[derive(Clone)]
pub struct DomainServiceContext {
    principal: Principal,
    request: RequestKind,
    provider: Option<Arc<dyn ServiceProvider>>,
    is_local: bool,
}

impl DomainServiceContext {
    /// Context for a request by `principal`
    pub fn new(principal: Principal, request: RequestKind) -> Self {
        Self {
            principal,
            request,
            provider: None,
            is_local: false,
        }
    }

    /// Attach a service provider
    pub fn with_provider(mut self, provider: Arc<dyn ServiceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Mark the request as coming from the local machine
    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    /// Calling user
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Kind of request being served
    pub fn request(&self) -> RequestKind {
        self.request
    }

    /// Host services
    pub fn provider(&self) -> Option<&Arc<dyn ServiceProvider>> {
        self.provider.as_ref()
    }

    /// Whether the request comes from the local machine
    pub fn is_local(&self) -> bool {
        self.is_local
    }
}

impl fmt::Debug for DomainServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainServiceContext")
            .field("principal", &self.principal)
            .field("request", &self.request)
            .field("is_local", &self.is_local)
            .finish_non_exhaustive()
    }
}

/// Application logic behind a service
pub trait DomainService: Sized + 'static {
    /// Request environment
    fn context(&self) -> &DomainServiceContext;

    /// Operation table
    fn description(&self) -> Arc<DomainServiceDescription<Self>>;

    /// Persist the executed change set
    ///
    /// Returns `false` when conflicts were recorded on the entries.
    fn persist_change_set(&mut self, _change_set: &mut ChangeSet) -> Result<bool, DomainError> {
        Ok(true)
    }

    /// Try to resolve recorded conflicts; `true` means persist again
    fn resolve_change_set(&mut self, _change_set: &mut ChangeSet) -> bool {
        false
    }

    /// Called with any error that aborts a request
    fn on_error(&mut self, _error: &DomainError) {}
}
