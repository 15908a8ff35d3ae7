//! Change-set processor
//!
//! [`ChangeSetProcessor::process`] is the single entry point for submits. It
//! runs the batch through every stage in order:
//!
//! ```text
//! entries -> size check -> normalize_delete -> ChangeSet::new
//!         -> reestablish_associations -> submit -> shape_for_transport
//! ```
//!
//! Structural problems (bad ids, unknown types, oversized batches) and
//! authorization failures come back as `Err`. Validation errors and conflicts
//! come back on the entries.

use crate::config::ServiceConfig;
use crate::service::DomainService;
use crate::submit::submit;
use ria_changeset::{normalize_delete, reestablish_associations, shape_for_transport, ChangeSet, ChangeSetEntry};
use ria_core::Result;
use ria_metadata::MetaTypeRegistry;
use std::sync::Arc;
use tracing::debug;

/// Runs submitted change sets through a domain service
#[derive(Debug, Clone)]
pub struct ChangeSetProcessor {
    registry: Arc<MetaTypeRegistry>,
    config: ServiceConfig,
}

impl ChangeSetProcessor {
    /// Processor resolving metadata through `registry`
    pub fn new(registry: Arc<MetaTypeRegistry>, config: ServiceConfig) -> Self {
        Self { registry, config }
    }

    /// Metadata registry
    pub fn registry(&self) -> &Arc<MetaTypeRegistry> {
        &self.registry
    }

    /// Service configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Process a submitted batch and return the entries to send back
    pub fn process<S: DomainService>(&self, service: &mut S, entries: Vec<ChangeSetEntry>) -> Result<Vec<ChangeSetEntry>> {
        self.config.check_change_set_size(entries.len())?;
        debug!(target: "ria::processor", entries = entries.len(), "Processing change set");

        let entries = entries.into_iter().map(normalize_delete).collect();
        let change_set = ChangeSet::new(entries)?;
        let mut change_set = reestablish_associations(change_set, &self.registry)?;

        let succeeded = submit(service, &mut change_set, &self.registry)?;
        debug!(target: "ria::processor", succeeded, "Change set submitted");

        let suppress = self.config.suppress_stack_traces(service.context().is_local());
        Ok(change_set
            .into_entries()
            .into_iter()
            .map(|entry| shape_for_transport(entry, suppress))
            .collect())
    }
}
