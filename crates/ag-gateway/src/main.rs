//! Authgate development server.
//!
//! Wires the in-memory backends together, seeds a starter set of provider
//! definitions, activates a default tenant, and runs until interrupted.
//! Production embeddings replace the memory store and channel with their
//! persistence-backed implementations and drive tenant activation from
//! their own control plane.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ag_core::{GatewayConfig, TenantRef};
use ag_gateway::{MemoryDefinitionStore, MemoryEventChannel, TenantContext};
use ag_spi::{Definition, DefinitionStore, EventChannel, ExtensionPoint};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::default();
    let channel = Arc::new(MemoryEventChannel::new());
    let store = Arc::new(MemoryDefinitionStore::new(Arc::clone(&channel)));
    let readiness = Arc::new(ag_spi::MemoryReadinessSink::new());

    let tenant = TenantRef::domain(Uuid::now_v7());
    seed_definitions(&store, tenant);

    let context = TenantContext::new(
        tenant,
        config,
        Arc::clone(&store) as Arc<dyn DefinitionStore>,
        Arc::clone(&channel) as Arc<dyn EventChannel>,
        readiness,
    );
    context
        .activate()
        .await
        .context("tenant activation failed")?;

    tracing::info!(%tenant, "authgate running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    context.deactivate().await;
    Ok(())
}

fn seed_definitions(store: &MemoryDefinitionStore, tenant: TenantRef) {
    store.put(Definition::new(
        "repo-main",
        "Main repository",
        "in-memory",
        serde_json::json!({}),
        tenant,
        ExtensionPoint::Repository,
    ));
    store.put(Definition::new(
        "notify-log",
        "Log notifier",
        "log",
        serde_json::json!({ "channel": "dev" }),
        tenant,
        ExtensionPoint::DeviceNotifier,
    ));
    store.put(Definition::new(
        "audit-log",
        "Log audit reporter",
        "log",
        serde_json::json!({}),
        tenant,
        ExtensionPoint::AuditReporter,
    ));
}
