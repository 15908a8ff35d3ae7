//! OpenRIA - change-set reconciliation and domain service dispatch
//!
//! OpenRIA takes a batch of client edits (a *change set*), rebuilds the
//! object graph the client had, and drives it through application code:
//! authorization, validation, insert/update/delete and custom operations,
//! persistence, and conflict resolution. Results go back to the client with
//! validation errors attached to the entries that caused them.
//!
//! # Quick Start
//!
//! ```ignore
//! use openria::{ChangeSetProcessor, ServiceConfig};
//!
//! let processor = ChangeSetProcessor::new(registry, ServiceConfig::default());
//! let results = processor.process(&mut service, entries)?;
//! ```
//!
//! # Architecture
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`core`] | entities, values, errors |
//! | [`metadata`] | schemas and the `MetaType` cache |
//! | [`changeset`] | entries and the reconciliation stages |
//! | [`server`] | authorization, validation, domain services, the processor |
//! | [`client`] | asynchronous operations and the authentication client |

pub use ria_changeset as changeset;
pub use ria_client as client;
pub use ria_core as core;
pub use ria_metadata as metadata;
pub use ria_server as server;

pub use ria_changeset::{ChangeSet, ChangeSetEntry, EntityActionInvocation, ValidationResultInfo};
pub use ria_core::{DomainOperation, Entity, Error, Result, TypeName, Value};
pub use ria_metadata::{MetaMember, MetaType, MetaTypeRegistry, MetadataProvider, SchemaRegistry};
pub use ria_server::{
    AuthorizationContext, ChangeSetProcessor, DomainError, DomainService, DomainServiceContext,
    DomainServiceDescription, Principal, ServiceConfig,
};
