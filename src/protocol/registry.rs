//! # Schema Registry
//!
//! Exact-string lookup from type identifier to [`SchemaDescriptor`].
//!
//! A registry is populated once at startup and read-only afterwards, so it
//! is shared between threads behind an `Arc` without locking. Descriptors are
//! handed out as `Arc<SchemaDescriptor>` and never mutated.
//!
//! ## Initialization order
//! load schema IR → populate a registry → optionally [`install_global`] →
//! serve decode requests

use crate::error::constants;
use crate::error::{CodecError, Result};
use crate::protocol::catalog;
use crate::protocol::schema::SchemaDescriptor;
use crate::utils::metrics::global_metrics;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Lookup table from type identifier to field layout
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<SchemaDescriptor>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a descriptor. A type id can be registered once.
    pub fn register(&mut self, descriptor: SchemaDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.schemas.contains_key(&descriptor.type_id) {
            return Err(CodecError::InvalidSchema(format!(
                "type id already registered: {}",
                descriptor.type_id
            )));
        }
        self.insert(descriptor);
        Ok(())
    }

    /// Register every descriptor in order, stopping at the first failure
    pub fn register_all<I>(&mut self, descriptors: I) -> Result<usize>
    where
        I: IntoIterator<Item = SchemaDescriptor>,
    {
        let mut count = 0;
        for descriptor in descriptors {
            self.register(descriptor)?;
            count += 1;
        }
        Ok(count)
    }

    /// Insert a descriptor already known to be valid and unique
    pub(crate) fn insert(&mut self, descriptor: SchemaDescriptor) {
        debug!(
            type_id = %descriptor.type_id,
            fields = descriptor.fields.len(),
            "Registered schema"
        );
        global_metrics().schema_registered();
        self.schemas
            .insert(descriptor.type_id.clone(), Arc::new(descriptor));
    }

    /// Resolve a type id, failing with `UnknownPacketType`
    pub fn resolve(&self, type_id: &str) -> Result<Arc<SchemaDescriptor>> {
        self.schemas
            .get(type_id)
            .cloned()
            .ok_or_else(|| CodecError::UnknownPacketType {
                type_id: type_id.to_string(),
            })
    }

    pub fn get(&self, type_id: &str) -> Option<&Arc<SchemaDescriptor>> {
        self.schemas.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.schemas.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered type ids, sorted
    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

static GLOBAL_REGISTRY: OnceCell<Arc<SchemaRegistry>> = OnceCell::new();

/// Install the process-wide registry. Succeeds once; later calls, or a call
/// after [`global`] has already fallen back to the catalog, fail.
pub fn install_global(registry: SchemaRegistry) -> Result<Arc<SchemaRegistry>> {
    let registry = Arc::new(registry);
    GLOBAL_REGISTRY
        .set(Arc::clone(&registry))
        .map_err(|_| CodecError::InvalidSchema(constants::ERR_GLOBAL_REGISTRY_SET.to_string()))?;
    debug!(schemas = registry.len(), "Installed global schema registry");
    Ok(registry)
}

/// The process-wide registry, defaulting to the built-in catalog
pub fn global() -> Arc<SchemaRegistry> {
    Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(catalog::builtin_registry())))
}
