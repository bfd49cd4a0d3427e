//! Table of every live GPU-backed resource.

use std::sync::{Arc, Weak};

use super::{GpuResource, ResourceId};

/// Registry of resources created through one device.
///
/// Entries are weak: the registry never keeps a resource alive. Iteration
/// yields newest-registered first and skips entries whose resource is
/// already being destroyed.
#[derive(Default)]
pub struct ResourceRegistry {
    entries: Vec<(ResourceId, Weak<dyn GpuResource>)>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Each id may only be registered once.
    pub fn register(&mut self, id: ResourceId, resource: Weak<dyn GpuResource>) {
        debug_assert!(
            !self.contains(id),
            "ResourceRegistry::register: {id} registered twice"
        );
        self.entries.push((id, resource));
    }

    /// Remove a resource. Returns false if it was not registered.
    pub fn unregister(&mut self, id: ResourceId) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns true if `id` is registered.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Strong references to every live resource, newest first.
    ///
    /// Entries whose resource can no longer be upgraded are pruned.
    pub fn snapshot(&mut self) -> Vec<Arc<dyn GpuResource>> {
        self.entries.retain(|(_, weak)| weak.strong_count() > 0);
        self.entries
            .iter()
            .rev()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}
