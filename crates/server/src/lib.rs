//! Server side of OpenRIA
//!
//! This crate drives submitted change sets into application code:
//! - [`ChangeSetProcessor`]: the processing pipeline entry point
//! - [`DomainService`] / [`DomainServiceDescription`]: application operations
//! - [`AuthorizationContext`] and rules: who may run what
//! - [`Validator`]: metadata-declared validation rules
//! - [`ServiceConfig`]: `ria.toml` settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authorization;
pub mod config;
pub mod description;
pub mod principal;
pub mod processor;
pub mod query;
pub mod service;
pub mod services;
pub mod submit;
pub mod validation;

pub use authorization::{
    AuthorizationContext, AuthorizationResult, AuthorizationRule, ContextItems, RequiresAuthentication, RequiresRole,
};
pub use config::{CustomErrorsMode, ServiceConfig, CONFIG_FILE_NAME};
pub use description::{
    ActionHandler, CudHandler, DomainServiceDescription, InvokeHandler, Operation, OperationDescription, QueryHandler,
};
pub use principal::Principal;
pub use processor::ChangeSetProcessor;
pub use query::{invoke, query, InvokeResult, QueryOptions, QueryResult};
pub use service::{DomainError, DomainService, DomainServiceContext, RequestKind};
pub use services::{ServiceContainer, ServiceProvider, SharedService};
pub use submit::submit;
pub use validation::{ValidationContext, Validator};
