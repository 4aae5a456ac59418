//! Tenant references.
//!
//! Every definition and every configuration event in Authgate is scoped to
//! exactly one tenant. Registries compare tenant references to decide
//! whether an event concerns them, so equality here is load-bearing for
//! tenant isolation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of entity a tenant reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantKind {
    /// A top-level identity domain.
    Domain,
    /// An organization nested under a domain.
    Organization,
}

/// A reference to one tenant.
///
/// Definitions and events carry a `TenantRef`; a registry only reacts to
/// events whose reference matches its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantRef {
    /// What kind of tenant this references.
    pub kind: TenantKind,
    /// The tenant's unique identifier.
    pub id: Uuid,
}

impl TenantRef {
    /// Creates a reference to a domain tenant.
    #[must_use]
    pub const fn domain(id: Uuid) -> Self {
        Self {
            kind: TenantKind::Domain,
            id,
        }
    }

    /// Creates a reference to an organization tenant.
    #[must_use]
    pub const fn organization(id: Uuid) -> Self {
        Self {
            kind: TenantKind::Organization,
            id,
        }
    }
}

impl std::fmt::Display for TenantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            TenantKind::Domain => "domain",
            TenantKind::Organization => "organization",
        };
        write!(f, "{kind}:{}", self.id)
    }
}
