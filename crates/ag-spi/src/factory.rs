//! Provider construction.
//!
//! Provider types are resolved through an explicit, statically registered
//! catalog instead of reflective class loading: each extension point
//! assembles its catalog at process startup, so an unknown built-in type
//! is caught before any tenant is activated, and a genuinely unknown
//! external type fails with a clean error at deploy time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SpiError, SpiResult};
use crate::provider::BuiltProvider;

/// Constructs provider instances of one provider type.
///
/// Builders are registered once per catalog and shared across tenants;
/// they must not retain mutable state between `build` calls, so that no
/// state can leak from one tenant's provider into another's.
#[async_trait]
pub trait ProviderBuilder<P: ?Sized + Send + Sync>: Send + Sync {
    /// The provider type identifier definitions refer to.
    fn provider_type(&self) -> &'static str;

    /// Builds a provider instance from a definition's configuration blob.
    ///
    /// Fails with [`SpiError::InvalidConfig`] when the blob does not match
    /// the builder's configuration schema.
    async fn build(&self, config: &serde_json::Value) -> SpiResult<BuiltProvider<P>>;
}

/// Statically registered map from provider type to builder.
///
/// One catalog exists per extension point; it is assembled at startup and
/// never mutated afterwards.
pub struct ProviderCatalog<P: ?Sized + Send + Sync> {
    builders: HashMap<&'static str, Arc<dyn ProviderBuilder<P>>>,
}

impl<P: ?Sized + Send + Sync> ProviderCatalog<P> {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registers a builder, replacing any previous builder for the same
    /// provider type.
    pub fn register(&mut self, builder: Arc<dyn ProviderBuilder<P>>) {
        let provider_type = builder.provider_type();
        if self.builders.insert(provider_type, builder).is_some() {
            tracing::warn!(provider_type, "replacing previously registered builder");
        }
    }

    /// Builds a provider for the given type and configuration.
    ///
    /// Fails with [`SpiError::UnknownType`] when no builder is registered
    /// for `provider_type`.
    pub async fn create(
        &self,
        provider_type: &str,
        config: &serde_json::Value,
    ) -> SpiResult<BuiltProvider<P>> {
        let builder = self
            .builders
            .get(provider_type)
            .ok_or_else(|| SpiError::UnknownType(provider_type.to_string()))?;
        builder.build(config).await
    }

    /// Returns whether a builder is registered for the given type.
    #[must_use]
    pub fn has_type(&self, provider_type: &str) -> bool {
        self.builders.contains_key(provider_type)
    }

    /// Lists the registered provider types.
    #[must_use]
    pub fn types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.builders.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

impl<P: ?Sized + Send + Sync> Default for ProviderCatalog<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized + Send + Sync> std::fmt::Debug for ProviderCatalog<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("types", &self.types())
            .finish()
    }
}
