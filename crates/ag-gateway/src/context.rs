//! Per-tenant runtime context.
//!
//! ## NIST 800-53 Rev5: SC-4 (Information in Shared System Resources)
//!
//! Each active tenant owns a [`TenantContext`] holding one provider
//! registry per extension point. Contexts share the definition store, the
//! event channel and the readiness sink, but never provider instances:
//! everything stateful is created per tenant and released when the tenant
//! is deactivated.

use std::sync::Arc;

use ag_core::{GatewayConfig, TenantRef};
use ag_extensions::{audit, identity, mfa, notifier, repository};
use ag_extensions::{AuditReporter, DeviceNotifier, IdentityProvider, MfaFactor, Repository};
use ag_registry::{ProviderRegistry, RegistryResult};
use ag_spi::{DefinitionStore, EventChannel, ExtensionPoint, ReadinessSink};

/// The registries of one active tenant.
///
/// Created by [`TenantContext::new`], brought live by
/// [`activate`](TenantContext::activate), and torn down by
/// [`deactivate`](TenantContext::deactivate). The request path reaches
/// providers exclusively through the accessors here.
pub struct TenantContext {
    tenant: TenantRef,
    config: GatewayConfig,
    repositories: Arc<ProviderRegistry<dyn Repository>>,
    identity_providers: Arc<ProviderRegistry<dyn IdentityProvider>>,
    mfa_factors: Arc<ProviderRegistry<dyn MfaFactor>>,
    notifiers: Arc<ProviderRegistry<dyn DeviceNotifier>>,
    audit_reporters: Arc<ProviderRegistry<dyn AuditReporter>>,
}

impl TenantContext {
    /// Creates an inactive context with a registry per extension point,
    /// all backed by the built-in provider catalogs.
    #[must_use]
    pub fn new(
        tenant: TenantRef,
        config: GatewayConfig,
        store: Arc<dyn DefinitionStore>,
        channel: Arc<dyn EventChannel>,
        readiness: Arc<dyn ReadinessSink>,
    ) -> Self {
        Self {
            tenant,
            config,
            repositories: Arc::new(ProviderRegistry::new(
                tenant,
                ExtensionPoint::Repository,
                Arc::clone(&store),
                Arc::clone(&channel),
                Arc::new(repository::catalog()),
                Arc::clone(&readiness),
            )),
            identity_providers: Arc::new(ProviderRegistry::new(
                tenant,
                ExtensionPoint::IdentityProvider,
                Arc::clone(&store),
                Arc::clone(&channel),
                Arc::new(identity::catalog()),
                Arc::clone(&readiness),
            )),
            mfa_factors: Arc::new(ProviderRegistry::new(
                tenant,
                ExtensionPoint::MfaFactor,
                Arc::clone(&store),
                Arc::clone(&channel),
                Arc::new(mfa::catalog()),
                Arc::clone(&readiness),
            )),
            notifiers: Arc::new(ProviderRegistry::new(
                tenant,
                ExtensionPoint::DeviceNotifier,
                Arc::clone(&store),
                Arc::clone(&channel),
                Arc::new(notifier::catalog()),
                Arc::clone(&readiness),
            )),
            audit_reporters: Arc::new(ProviderRegistry::new(
                tenant,
                ExtensionPoint::AuditReporter,
                store,
                channel,
                Arc::new(audit::catalog()),
                readiness,
            )),
        }
    }

    /// Returns the tenant this context serves.
    #[must_use]
    pub const fn tenant(&self) -> &TenantRef {
        &self.tenant
    }

    /// Starts every registry.
    ///
    /// Repositories go first and are bootstrap-critical: their deploys are
    /// retried under the configured backoff policy, and exhausting it
    /// aborts activation. The remaining extension points start in a fixed
    /// order without retry. When any registry fails to start, the ones
    /// already running are stopped before the error is returned, so a
    /// failed activation leaves no live instances behind.
    ///
    /// ## Errors
    ///
    /// Propagates the first registry start failure.
    pub async fn activate(&self) -> RegistryResult<()> {
        tracing::info!(tenant = %self.tenant, "activating tenant");
        if let Err(error) = self.repositories.start_critical(&self.config.bootstrap).await {
            tracing::error!(
                tenant = %self.tenant,
                point = "repository",
                %error,
                "tenant activation failed, rolling back"
            );
            self.deactivate().await;
            return Err(error);
        }

        let remaining: [(&str, RegistryResult<()>); 4] = [
            ("identity", self.identity_providers.start().await),
            ("mfa", self.mfa_factors.start().await),
            ("notifier", self.notifiers.start().await),
            ("audit", self.audit_reporters.start().await),
        ];
        for (point, result) in remaining {
            if let Err(error) = result {
                tracing::error!(
                    tenant = %self.tenant,
                    point,
                    %error,
                    "tenant activation failed, rolling back"
                );
                self.deactivate().await;
                return Err(error);
            }
        }

        tracing::info!(tenant = %self.tenant, "tenant active");
        Ok(())
    }

    /// Stops every registry, releasing all provider instances.
    ///
    /// Registries stop in reverse activation order, repositories last.
    /// Safe to call on a context that never activated or only partially
    /// activated.
    pub async fn deactivate(&self) {
        self.audit_reporters.stop().await;
        self.notifiers.stop().await;
        self.mfa_factors.stop().await;
        self.identity_providers.stop().await;
        self.repositories.stop().await;
        tracing::info!(tenant = %self.tenant, "tenant deactivated");
    }

    // === Registry accessors ===

    /// The repository registry.
    #[must_use]
    pub fn repositories(&self) -> &Arc<ProviderRegistry<dyn Repository>> {
        &self.repositories
    }

    /// The identity provider registry.
    #[must_use]
    pub fn identity_providers(&self) -> &Arc<ProviderRegistry<dyn IdentityProvider>> {
        &self.identity_providers
    }

    /// The MFA factor registry.
    #[must_use]
    pub fn mfa_factors(&self) -> &Arc<ProviderRegistry<dyn MfaFactor>> {
        &self.mfa_factors
    }

    /// The device notifier registry.
    #[must_use]
    pub fn notifiers(&self) -> &Arc<ProviderRegistry<dyn DeviceNotifier>> {
        &self.notifiers
    }

    /// The audit reporter registry.
    #[must_use]
    pub fn audit_reporters(&self) -> &Arc<ProviderRegistry<dyn AuditReporter>> {
        &self.audit_reporters
    }
}

impl std::fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContext")
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}
