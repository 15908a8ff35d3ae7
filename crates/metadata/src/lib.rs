//! Entity metadata for OpenRIA
//!
//! Types are declared with [`TypeDescriptor`]s and registered in a
//! [`MetadataProvider`]. [`MetaTypeRegistry`] turns declarations into cached,
//! immutable [`MetaType`]s used by the change-set pipeline and the server.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod meta_member;
pub mod meta_type;
pub mod provider;
pub mod registry;
pub mod rules;

pub use descriptor::{
    AssociationDescriptor, EntityActionDescriptor, MemberDescriptor, MemberShape, ParameterDescriptor,
    ScalarKind, TypeDescriptor, TypeKind,
};
pub use meta_member::{MemberAccessor, MetaMember};
pub use meta_type::MetaType;
pub use provider::{MetadataProvider, SchemaRegistry};
pub use registry::MetaTypeRegistry;
pub use rules::{CustomCheck, RuleContext, ValidationRule};
