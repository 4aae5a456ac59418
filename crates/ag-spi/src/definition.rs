//! Provider definitions and the definition store.
//!
//! A [`Definition`] is the persisted, versioned configuration record for
//! one provider instance. Definitions are immutable once fetched: saving a
//! change produces a new value with a later `updated_at`, and registries
//! compare timestamps to decide whether a cached instance is stale.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use ag_core::TenantRef;

use crate::error::SpiResult;
use crate::extension::ExtensionPoint;

/// A stream of definitions, as returned by bulk-load.
pub type DefinitionStream = BoxStream<'static, SpiResult<Definition>>;

/// The persisted configuration record for one provider instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Unique identifier, stable across versions.
    pub id: String,
    /// Human-readable name, shown in health reporting.
    pub name: String,
    /// Provider type identifier resolved through the catalog.
    pub provider_type: String,
    /// Opaque configuration blob, interpreted only by the builder.
    pub config: serde_json::Value,
    /// The tenant this definition belongs to.
    pub tenant: TenantRef,
    /// The extension point this definition configures.
    pub extension: ExtensionPoint,
    /// Version marker; a later timestamp supersedes an earlier one.
    pub updated_at: DateTime<Utc>,
}

impl Definition {
    /// Creates a new definition versioned at the current time.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        provider_type: impl Into<String>,
        config: serde_json::Value,
        tenant: TenantRef,
        extension: ExtensionPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider_type: provider_type.into(),
            config,
            tenant,
            extension,
            updated_at: Utc::now(),
        }
    }

    /// Returns a copy of this definition with a different version marker.
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Returns whether `other` is a newer version of the same definition.
    #[must_use]
    pub fn is_superseded_by(&self, other: &Self) -> bool {
        self.id == other.id && self.updated_at < other.updated_at
    }
}

/// Read access to persisted definitions.
///
/// Implemented by the storage layer; consumed by the registries. Both
/// operations are tenant- and extension-scoped, so an implementation can
/// never leak one tenant's definitions into another tenant's registry.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Streams all definitions for one tenant and extension point.
    ///
    /// Used once per registry, at bulk-load.
    async fn find_all(
        &self,
        tenant: &TenantRef,
        extension: ExtensionPoint,
    ) -> SpiResult<DefinitionStream>;

    /// Fetches the current version of one definition.
    ///
    /// Returns `Ok(None)` when the definition does not exist; a definition
    /// deleted between an event firing and the fetch is not an error.
    async fn find_by_id(
        &self,
        tenant: &TenantRef,
        extension: ExtensionPoint,
        id: &str,
    ) -> SpiResult<Option<Definition>>;
}
