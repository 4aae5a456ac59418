//! Extension point descriptors.

use serde::{Deserialize, Serialize};

/// The pluggable extension points of the gateway.
///
/// One registry exists per tenant per extension point; definitions and
/// events always name the extension point they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionPoint {
    /// End-user authentication backends (directories, external IdPs).
    IdentityProvider,
    /// Second-factor authentication methods.
    MfaFactor,
    /// Out-of-band delivery channels (push, SMS, email).
    DeviceNotifier,
    /// Audit event sinks.
    AuditReporter,
    /// Core persistence repositories.
    Repository,
}

impl ExtensionPoint {
    /// All extension points, in bootstrap order.
    ///
    /// [`ExtensionPoint::Repository`] comes first: the remaining points may
    /// depend on persistence being available.
    pub const ALL: [Self; 5] = [
        Self::Repository,
        Self::IdentityProvider,
        Self::MfaFactor,
        Self::DeviceNotifier,
        Self::AuditReporter,
    ];

    /// Returns the stable name of this extension point.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IdentityProvider => "identity-provider",
            Self::MfaFactor => "mfa-factor",
            Self::DeviceNotifier => "device-notifier",
            Self::AuditReporter => "audit-reporter",
            Self::Repository => "repository",
        }
    }

    /// Returns whether the gateway cannot start without this extension
    /// point being fully deployed.
    ///
    /// Bootstrap-critical points are deployed with a bounded retry policy
    /// during tenant activation; all others tolerate partial failure.
    #[must_use]
    pub const fn is_bootstrap_critical(self) -> bool {
        matches!(self, Self::Repository)
    }
}

impl std::fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
