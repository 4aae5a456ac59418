//! Readiness reporting.
//!
//! Every deploy attempt, successful or not, is recorded per tenant,
//! extension point and definition id. The sink is purely observational:
//! health endpoints read it, but nothing in the reconciliation path ever
//! consults it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use ag_core::TenantRef;

use crate::extension::ExtensionPoint;

/// The recorded outcome of one deploy attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessRecord {
    /// The tenant the definition belongs to.
    pub tenant: TenantRef,
    /// The extension point the definition configures.
    pub extension: ExtensionPoint,
    /// The definition id.
    pub id: String,
    /// The definition's human-readable name.
    pub name: String,
    /// Whether the deploy attempt succeeded.
    pub success: bool,
    /// Error message, for failed attempts.
    pub error: Option<String>,
    /// When the attempt finished.
    pub at: DateTime<Utc>,
}

impl ReadinessRecord {
    /// Records a successful deploy.
    #[must_use]
    pub fn success(
        tenant: TenantRef,
        extension: ExtensionPoint,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            tenant,
            extension,
            id: id.into(),
            name: name.into(),
            success: true,
            error: None,
            at: Utc::now(),
        }
    }

    /// Records a failed deploy with its error message.
    #[must_use]
    pub fn failure(
        tenant: TenantRef,
        extension: ExtensionPoint,
        id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tenant,
            extension,
            id: id.into(),
            name: name.into(),
            success: false,
            error: Some(error.into()),
            at: Utc::now(),
        }
    }
}

/// Destination for readiness records.
pub trait ReadinessSink: Send + Sync {
    /// Records the outcome of one deploy attempt, superseding any earlier
    /// record for the same tenant, extension point and definition id.
    fn report(&self, record: ReadinessRecord);
}

/// In-memory readiness sink keeping the latest record per definition.
///
/// Backs the health endpoint in single-process deployments and all tests.
#[derive(Debug, Default)]
pub struct MemoryReadinessSink {
    latest: DashMap<(TenantRef, ExtensionPoint, String), ReadinessRecord>,
}

impl MemoryReadinessSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the latest record for one definition, if any.
    #[must_use]
    pub fn latest(
        &self,
        tenant: &TenantRef,
        extension: ExtensionPoint,
        id: &str,
    ) -> Option<ReadinessRecord> {
        self.latest
            .get(&(*tenant, extension, id.to_string()))
            .map(|r| r.clone())
    }

    /// Returns all records for one tenant.
    #[must_use]
    pub fn for_tenant(&self, tenant: &TenantRef) -> Vec<ReadinessRecord> {
        self.latest
            .iter()
            .filter(|entry| entry.key().0 == *tenant)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns whether every recorded deploy for the tenant succeeded.
    ///
    /// A tenant with no records at all is considered ready: readiness only
    /// reflects attempted deploys.
    #[must_use]
    pub fn is_ready(&self, tenant: &TenantRef) -> bool {
        self.latest
            .iter()
            .filter(|entry| entry.key().0 == *tenant)
            .all(|entry| entry.value().success)
    }
}

impl ReadinessSink for MemoryReadinessSink {
    fn report(&self, record: ReadinessRecord) {
        self.latest.insert(
            (record.tenant, record.extension, record.id.clone()),
            record,
        );
    }
}
