//! Change sets for OpenRIA
//!
//! This crate holds the submitted batch model and the reconciliation stages
//! that run before a domain service sees the batch:
//! - [`normalize_delete`]: deletes operate on the original entity
//! - [`ChangeSet::new`]: structural validation of the batch
//! - [`reestablish_associations`]: rebuild references between entries
//! - [`shape_for_transport`]: strip submission-only payload from results
//!
//! Each stage takes its input by value and returns the transformed value.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod associations;
pub mod change_set;
pub mod entry;
pub mod normalize;
pub mod transport;

pub use associations::{link_member, reestablish_associations};
pub use change_set::ChangeSet;
pub use entry::{AssociationMap, ChangeSetEntry, EntityActionInvocation, ValidationResultInfo};
pub use normalize::normalize_delete;
pub use transport::shape_for_transport;
