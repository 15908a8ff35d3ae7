//! Cached metadata lookup
//!
//! [`MetaTypeRegistry`] builds a [`MetaType`] the first time a type is asked
//! for and hands out the same `Arc` afterwards. Concurrent first requests may
//! both build; the first insert wins and every caller observes that instance.

use crate::meta_type::MetaType;
use crate::provider::MetadataProvider;
use dashmap::DashMap;
use ria_core::{Error, Result, TypeName};
use std::sync::Arc;
use tracing::debug;

/// Process-wide, thread-safe `MetaType` cache over a [`MetadataProvider`]
pub struct MetaTypeRegistry {
    provider: Arc<dyn MetadataProvider>,
    cache: DashMap<TypeName, Arc<MetaType>>,
}

impl MetaTypeRegistry {
    /// Create an empty cache over `provider`
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
        }
    }

    /// Metadata of `type_name`, built on first request
    pub fn get_meta_type(&self, type_name: &TypeName) -> Result<Arc<MetaType>> {
        if let Some(existing) = self.cache.get(type_name) {
            return Ok(existing.value().clone());
        }

        // Build without holding a shard lock
        let descriptor = self
            .provider
            .describe(type_name)
            .ok_or_else(|| Error::unknown_type(type_name.as_str()))?;
        let built = Arc::new(MetaType::build(&descriptor, self.provider.as_ref())?);
        debug!(
            target: "ria::metadata",
            type_name = %type_name,
            members = built.members().count(),
            requires_validation = built.requires_validation(),
            "Built meta type"
        );

        let entry = self.cache.entry(type_name.clone()).or_insert(built);
        Ok(entry.value().clone())
    }

    /// Underlying provider
    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    /// Number of cached types
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached yet
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl std::fmt::Debug for MetaTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaTypeRegistry")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
