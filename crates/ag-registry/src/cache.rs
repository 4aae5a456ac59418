//! The registry's two-map cache.
//!
//! `instances` maps definition ids to live provider instances; `definitions`
//! keeps the last version successfully applied for each id. Both maps are
//! concurrent and support per-key atomic replace, which is all readers need:
//! request-processing code only ever observes one id at a time.

use dashmap::DashMap;
use std::sync::Arc;

use ag_spi::{BuiltProvider, Definition, ProviderLifecycle};

/// A cached provider instance together with its lifecycle handle.
pub struct CachedProvider<P: ?Sized> {
    /// The live provider instance.
    pub provider: Arc<P>,
    /// Lifecycle handle, present only for lifecycle-managed providers.
    pub lifecycle: Option<Arc<dyn ProviderLifecycle>>,
}

impl<P: ?Sized> From<BuiltProvider<P>> for CachedProvider<P> {
    fn from(built: BuiltProvider<P>) -> Self {
        Self {
            provider: built.provider,
            lifecycle: built.lifecycle,
        }
    }
}

/// The in-memory cache of one registry.
///
/// Invariant: an id present in `instances` is always present in
/// `definitions`, and the stored definition is the version that produced
/// the stored instance. [`ProviderCache::insert`] and
/// [`ProviderCache::remove`] maintain this by writing `definitions` before
/// exposing or after hiding the instance.
pub struct ProviderCache<P: ?Sized> {
    instances: DashMap<String, CachedProvider<P>>,
    definitions: DashMap<String, Definition>,
}

impl<P: ?Sized> ProviderCache<P> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
            definitions: DashMap::new(),
        }
    }

    /// Returns the cached instance for an id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<P>> {
        self.instances.get(id).map(|entry| Arc::clone(&entry.provider))
    }

    /// Returns a snapshot of all cached instances.
    #[must_use]
    pub fn get_all(&self) -> Vec<(String, Arc<P>)> {
        self.instances
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(&entry.value().provider)))
            .collect()
    }

    /// Returns the last successfully applied definition for an id.
    #[must_use]
    pub fn definition(&self, id: &str) -> Option<Definition> {
        self.definitions.get(id).map(|entry| entry.clone())
    }

    /// Returns whether a fetched definition requires deployment.
    ///
    /// True when the id has never been deployed, or when the cached
    /// version is older than the fetched one. Duplicate and late event
    /// deliveries fall out here as no-ops.
    #[must_use]
    pub fn needs_deployment(&self, fetched: &Definition) -> bool {
        match self.definitions.get(&fetched.id) {
            Some(current) => current.is_superseded_by(fetched),
            None => true,
        }
    }

    /// Publishes a new instance for a definition, returning the displaced
    /// instance if one existed.
    ///
    /// The definition is recorded first so that a reader observing the new
    /// instance always finds its producing version.
    pub fn insert(&self, definition: Definition, built: BuiltProvider<P>) -> Option<CachedProvider<P>> {
        let id = definition.id.clone();
        self.definitions.insert(id.clone(), definition);
        self.instances.insert(id, built.into())
    }

    /// Removes an id from both maps, returning the removed instance.
    ///
    /// Idempotent: removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) -> Option<CachedProvider<P>> {
        let removed = self.instances.remove(id).map(|(_, cached)| cached);
        self.definitions.remove(id);
        removed
    }

    /// Empties the cache, returning every cached instance for shutdown.
    pub fn drain(&self) -> Vec<(String, CachedProvider<P>)> {
        let ids: Vec<String> = self.instances.iter().map(|e| e.key().clone()).collect();
        let mut drained = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((key, cached)) = self.instances.remove(&id) {
                drained.push((key, cached));
            }
        }
        self.definitions.clear();
        drained
    }

    /// Returns the number of cached instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<P: ?Sized> Default for ProviderCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
