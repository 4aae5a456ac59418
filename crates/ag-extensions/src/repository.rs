//! Repository extension point.
//!
//! Repositories provide the gateway's core persistence surface. This is
//! the bootstrap-critical extension point: tenant activation deploys it
//! with a bounded retry policy and aborts startup if it cannot be brought
//! up, because the gateway has no useful behavior without persistence.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use ag_spi::{BuiltProvider, ProviderBuilder, ProviderCatalog, SpiError, SpiResult};

/// A pluggable key-value persistence backend.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Reads the value stored under a key.
    async fn get(&self, key: &str) -> SpiResult<Option<serde_json::Value>>;

    /// Stores a value under a key, replacing any previous value.
    async fn put(&self, key: &str, value: serde_json::Value) -> SpiResult<()>;

    /// Removes a key, returning whether it existed.
    async fn delete(&self, key: &str) -> SpiResult<bool>;

    /// Lists all stored keys.
    async fn keys(&self) -> SpiResult<Vec<String>>;
}

// ============================================================================
// In-memory repository
// ============================================================================

#[derive(Debug, Deserialize)]
struct InMemoryConfig {
    /// Optional key prefix, letting several definitions share a process
    /// without colliding.
    #[serde(default)]
    prefix: Option<String>,
}

/// Repository backed by process memory.
///
/// For production with multiple instances, a distributed backend registers
/// its own builder.
#[derive(Debug)]
pub struct InMemoryRepository {
    prefix: String,
    entries: DashMap<String, serde_json::Value>,
}

impl InMemoryRepository {
    fn qualified(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get(&self, key: &str) -> SpiResult<Option<serde_json::Value>> {
        Ok(self.entries.get(&self.qualified(key)).map(|v| v.clone()))
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> SpiResult<()> {
        self.entries.insert(self.qualified(key), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> SpiResult<bool> {
        Ok(self.entries.remove(&self.qualified(key)).is_some())
    }

    async fn keys(&self) -> SpiResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter_map(|entry| entry.key().strip_prefix(&self.prefix).map(str::to_string))
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }
}

/// Builder for [`InMemoryRepository`].
#[derive(Debug, Default)]
pub struct InMemoryRepositoryBuilder;

#[async_trait]
impl ProviderBuilder<dyn Repository> for InMemoryRepositoryBuilder {
    fn provider_type(&self) -> &'static str {
        "in-memory"
    }

    async fn build(&self, config: &serde_json::Value) -> SpiResult<BuiltProvider<dyn Repository>> {
        let config: InMemoryConfig =
            serde_json::from_value(config.clone()).map_err(SpiError::invalid_config)?;
        Ok(BuiltProvider::stateless(Arc::new(InMemoryRepository {
            prefix: config.prefix.unwrap_or_default(),
            entries: DashMap::new(),
        })))
    }
}

/// Assembles the catalog of built-in repositories.
#[must_use]
pub fn catalog() -> ProviderCatalog<dyn Repository> {
    let mut catalog = ProviderCatalog::new();
    catalog.register(Arc::new(InMemoryRepositoryBuilder));
    catalog
}
