//! Delete normalization

use crate::entry::ChangeSetEntry;
use ria_core::DomainOperation;

/// Make a delete operate on the last known server state
///
/// For a delete carrying an original entity, the original entity and original
/// associations replace the current payload and the original fields are
/// cleared. Other entries pass through unchanged.
pub fn normalize_delete(mut entry: ChangeSetEntry) -> ChangeSetEntry {
    if entry.operation == DomainOperation::Delete {
        if let Some(original) = entry.original_entity.take() {
            entry.entity = original;
            entry.associations = entry.original_associations.take();
        }
    }
    entry
}
