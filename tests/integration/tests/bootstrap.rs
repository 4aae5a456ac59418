//! Bootstrap-critical startup behavior.

use serde_json::json;

use ag_core::{GatewayConfig, RetryPolicy};
use ag_registry::RegistryError;
use ag_spi::ExtensionPoint;

use crate::common::{definition, tenant, TestEnv};

fn fast_retry(max_attempts: u32) -> GatewayConfig {
    GatewayConfig {
        bootstrap: RetryPolicy {
            max_attempts,
            initial_delay_ms: 1,
            multiplier: 2,
            max_delay_ms: 4,
        },
    }
}

#[tokio::test]
async fn unresolvable_repository_fails_activation_after_bounded_retries() {
    let env = TestEnv::new();
    let tenant = tenant();
    env.store.put(definition(
        tenant,
        ExtensionPoint::Repository,
        "repo-main",
        "postgres",
        json!({ "url": "postgres://localhost/authgate" }),
    ));

    let context = env.context_with(tenant, fast_retry(3));
    let error = context.activate().await.unwrap_err();

    match error {
        RegistryError::BootstrapExhausted { id, attempts, .. } => {
            assert_eq!(id, "repo-main");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other}"),
    }

    let record = env
        .readiness
        .latest(&tenant, ExtensionPoint::Repository, "repo-main")
        .unwrap();
    assert!(!record.success);

    context.deactivate().await;
}

#[tokio::test]
async fn non_critical_failures_do_not_abort_activation() {
    let env = TestEnv::new();
    let tenant = tenant();
    env.store.put(definition(
        tenant,
        ExtensionPoint::Repository,
        "repo-main",
        "in-memory",
        json!({}),
    ));
    env.store.put(definition(
        tenant,
        ExtensionPoint::AuditReporter,
        "audit",
        "buffered",
        json!({ "capacity": 0 }),
    ));

    let context = env.context_with(tenant, fast_retry(2));
    context.activate().await.unwrap();

    assert!(context.repositories().get("repo-main").is_some());
    assert!(context.audit_reporters().is_empty());
    assert!(!env.readiness.is_ready(&tenant));

    context.deactivate().await;
}

#[tokio::test]
async fn a_tenant_can_be_reactivated_after_a_failed_start() {
    let env = TestEnv::new();
    let tenant = tenant();
    env.store.put(definition(
        tenant,
        ExtensionPoint::Repository,
        "repo-main",
        "postgres",
        json!({}),
    ));

    let context = env.context_with(tenant, fast_retry(2));
    assert!(context.activate().await.is_err());

    // Fix the definition and try again on the same context.
    env.store.put(definition(
        tenant,
        ExtensionPoint::Repository,
        "repo-main",
        "in-memory",
        json!({}),
    ));
    context.activate().await.unwrap();

    assert!(context.repositories().get("repo-main").is_some());
    assert!(env.readiness.is_ready(&tenant));

    context.deactivate().await;
}

#[tokio::test]
async fn transient_bootstrap_settings_round_trip_through_config() {
    // Operators tune the policy through configuration files.
    let raw = json!({
        "bootstrap": {
            "max_attempts": 4,
            "initial_delay_ms": 50,
            "multiplier": 3,
            "max_delay_ms": 1000
        }
    });
    let config: GatewayConfig = serde_json::from_value(raw).unwrap();
    assert_eq!(config.bootstrap.max_attempts, 4);
    assert_eq!(
        config.bootstrap.delay_for(2),
        std::time::Duration::from_millis(150)
    );
}
