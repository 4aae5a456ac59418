//! Tenant isolation: contexts sharing backends never share state.

use serde_json::json;

use ag_spi::ExtensionPoint;

use crate::common::{definition, tenant, wait_for, TestEnv};

#[tokio::test]
async fn deployments_are_invisible_to_other_tenants() {
    let env = TestEnv::new();
    let a = tenant();
    let b = tenant();

    env.store.put(definition(
        a,
        ExtensionPoint::Repository,
        "repo-main",
        "in-memory",
        json!({}),
    ));

    let context_a = env.context(a);
    let context_b = env.context(b);
    context_a.activate().await.unwrap();
    context_b.activate().await.unwrap();

    assert!(context_a.repositories().get("repo-main").is_some());
    assert!(context_b.repositories().get("repo-main").is_none());

    // A post-activation deploy for B is likewise invisible to A.
    env.store.put(definition(
        b,
        ExtensionPoint::MfaFactor,
        "otp",
        "otp",
        json!({}),
    ));
    wait_for("tenant B factor deployed", || {
        context_b.mfa_factors().get("otp").is_some()
    })
    .await;
    assert!(context_a.mfa_factors().get("otp").is_none());

    context_a.deactivate().await;
    context_b.deactivate().await;
}

#[tokio::test]
async fn same_id_resolves_per_tenant() {
    let env = TestEnv::new();
    let a = tenant();
    let b = tenant();

    env.store.put(definition(
        a,
        ExtensionPoint::MfaFactor,
        "otp",
        "otp",
        json!({ "digits": 4 }),
    ));
    env.store.put(definition(
        b,
        ExtensionPoint::MfaFactor,
        "otp",
        "otp",
        json!({ "digits": 8 }),
    ));

    let context_a = env.context(a);
    let context_b = env.context(b);
    context_a.activate().await.unwrap();
    context_b.activate().await.unwrap();

    let code_a = context_a
        .mfa_factors()
        .get("otp")
        .unwrap()
        .begin_challenge("alice")
        .await
        .unwrap()
        .code;
    let code_b = context_b
        .mfa_factors()
        .get("otp")
        .unwrap()
        .begin_challenge("alice")
        .await
        .unwrap()
        .code;

    assert_eq!(code_a.len(), 4);
    assert_eq!(code_b.len(), 8);

    context_a.deactivate().await;
    context_b.deactivate().await;
}

#[tokio::test]
async fn deactivating_one_tenant_leaves_the_other_running() {
    let env = TestEnv::new();
    let a = tenant();
    let b = tenant();

    for t in [a, b] {
        env.store.put(definition(
            t,
            ExtensionPoint::Repository,
            "repo-main",
            "in-memory",
            json!({}),
        ));
    }

    let context_a = env.context(a);
    let context_b = env.context(b);
    context_a.activate().await.unwrap();
    context_b.activate().await.unwrap();

    context_a.deactivate().await;
    assert!(context_a.repositories().is_empty());

    // B still serves lookups and still reconciles events.
    assert!(context_b.repositories().get("repo-main").is_some());
    env.store.put(definition(
        b,
        ExtensionPoint::DeviceNotifier,
        "notify",
        "log",
        json!({}),
    ));
    wait_for("tenant B notifier deployed", || {
        context_b.notifiers().get("notify").is_some()
    })
    .await;

    context_b.deactivate().await;
}

#[tokio::test]
async fn readiness_failures_are_scoped_to_their_tenant() {
    let env = TestEnv::new();
    let a = tenant();
    let b = tenant();

    env.store.put(definition(
        a,
        ExtensionPoint::MfaFactor,
        "otp",
        "otp",
        json!({ "digits": 0 }),
    ));
    env.store.put(definition(
        b,
        ExtensionPoint::MfaFactor,
        "otp",
        "otp",
        json!({}),
    ));

    let context_a = env.context(a);
    let context_b = env.context(b);
    // MFA is not bootstrap-critical, so the bad definition does not abort
    // activation; it is just recorded as failed.
    context_a.activate().await.unwrap();
    context_b.activate().await.unwrap();

    assert!(!env.readiness.is_ready(&a));
    assert!(env.readiness.is_ready(&b));
    assert!(context_a.mfa_factors().is_empty());
    assert!(context_b.mfa_factors().get("otp").is_some());

    context_a.deactivate().await;
    context_b.deactivate().await;
}
