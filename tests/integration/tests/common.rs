//! Common test utilities and fixtures.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use uuid::Uuid;

use ag_core::{GatewayConfig, TenantRef};
use ag_gateway::{MemoryDefinitionStore, MemoryEventChannel, TenantContext};
use ag_spi::{
    Definition, DefinitionStore, EventChannel, ExtensionPoint, MemoryReadinessSink, ReadinessSink,
};

/// Shared backends for one test: store, channel and readiness sink.
pub struct TestEnv {
    pub store: Arc<MemoryDefinitionStore>,
    pub channel: Arc<MemoryEventChannel>,
    pub readiness: Arc<MemoryReadinessSink>,
}

impl TestEnv {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("ag_registry=debug,ag_gateway=debug")
            .try_init();

        let channel = Arc::new(MemoryEventChannel::new());
        Self {
            store: Arc::new(MemoryDefinitionStore::new(Arc::clone(&channel))),
            channel,
            readiness: Arc::new(MemoryReadinessSink::new()),
        }
    }

    /// Creates an inactive context for a tenant, sharing this env's
    /// backends.
    pub fn context(&self, tenant: TenantRef) -> TenantContext {
        self.context_with(tenant, GatewayConfig::default())
    }

    pub fn context_with(&self, tenant: TenantRef, config: GatewayConfig) -> TenantContext {
        TenantContext::new(
            tenant,
            config,
            Arc::clone(&self.store) as Arc<dyn DefinitionStore>,
            Arc::clone(&self.channel) as Arc<dyn EventChannel>,
            Arc::clone(&self.readiness) as Arc<dyn ReadinessSink>,
        )
    }
}

/// A fresh tenant reference.
pub fn tenant() -> TenantRef {
    TenantRef::domain(Uuid::now_v7())
}

/// Builds a definition for the given scope.
pub fn definition(
    tenant: TenantRef,
    extension: ExtensionPoint,
    id: &str,
    provider_type: &str,
    config: serde_json::Value,
) -> Definition {
    Definition::new(id, id, provider_type, config, tenant, extension)
}

/// Polls a condition until it holds, panicking after two seconds.
///
/// Reconciliation is asynchronous; tests observe its effects by polling
/// the lookup surface rather than by sleeping fixed amounts.
pub async fn wait_for(description: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s: {description}");
}
