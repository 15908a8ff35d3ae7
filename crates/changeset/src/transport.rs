//! Result shaping

use crate::entry::ChangeSetEntry;

/// Strip an entry down to what is returned to the client
///
/// Submission-only payload (associations, entity actions, original state) is
/// always cleared. Stack traces of erroneous entries are removed when
/// `suppress_stack_traces` is set.
pub fn shape_for_transport(mut entry: ChangeSetEntry, suppress_stack_traces: bool) -> ChangeSetEntry {
    if suppress_stack_traces && entry.has_error() {
        for error in entry.validation_errors.iter_mut().flatten() {
            error.stack_trace = None;
        }
    }
    entry.associations = None;
    entry.entity_actions = None;
    entry.original_associations = None;
    entry.original_entity = None;
    entry
}
