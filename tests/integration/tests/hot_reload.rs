//! Hot reload: configuration changes applied to a live tenant without
//! restarting it.

use serde_json::json;

use ag_spi::ExtensionPoint;

use crate::common::{definition, tenant, wait_for, TestEnv};

#[tokio::test]
async fn bulk_load_deploys_everything_seeded_before_activation() {
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
        ExtensionPoint::MfaFactor,
        "otp-default",
        "otp",
        json!({}),
    ));
    env.store.put(definition(
        tenant,
        ExtensionPoint::MfaFactor,
        "otp-long",
        "otp",
        json!({ "digits": 8 }),
    ));

    let context = env.context(tenant);
    context.activate().await.unwrap();

    assert_eq!(context.repositories().len(), 1);
    assert_eq!(context.mfa_factors().len(), 2);
    assert!(env.readiness.is_ready(&tenant));

    context.deactivate().await;
}

#[tokio::test]
async fn deploying_after_activation_makes_the_provider_available() {
    let env = TestEnv::new();
    let tenant = tenant();
    let context = env.context(tenant);
    context.activate().await.unwrap();
    assert!(context.notifiers().is_empty());

    env.store.put(definition(
        tenant,
        ExtensionPoint::DeviceNotifier,
        "notify-sms",
        "log",
        json!({ "channel": "sms" }),
    ));

    wait_for("notifier deployed", || {
        context.notifiers().get("notify-sms").is_some()
    })
    .await;

    context
        .notifiers()
        .get("notify-sms")
        .unwrap()
        .notify("alice", "Login code", "123456")
        .await
        .unwrap();

    context.deactivate().await;
}

#[tokio::test]
async fn updating_a_definition_swaps_the_live_instance() {
    let env = TestEnv::new();
    let tenant = tenant();
    let otp = definition(tenant, ExtensionPoint::MfaFactor, "otp", "otp", json!({}));
    env.store.put(otp.clone());

    let context = env.context(tenant);
    context.activate().await.unwrap();

    let before = context.mfa_factors().get("otp").unwrap();
    let challenge = before.begin_challenge("alice").await.unwrap();
    assert_eq!(challenge.code.len(), 6);

    // Bump the version and widen the code.
    env.store.put(
        definition(
            tenant,
            ExtensionPoint::MfaFactor,
            "otp",
            "otp",
            json!({ "digits": 8 }),
        )
        .with_updated_at(otp.updated_at + chrono::Duration::seconds(1)),
    );

    wait_for("updated factor live", || {
        context
            .mfa_factors()
            .definition("otp")
            .is_some_and(|d| d.config["digits"] == 8)
    })
    .await;

    let after = context.mfa_factors().get("otp").unwrap();
    let challenge = after.begin_challenge("alice").await.unwrap();
    assert_eq!(challenge.code.len(), 8);

    context.deactivate().await;
}

#[tokio::test]
async fn stale_update_events_do_not_redeploy() {
    let env = TestEnv::new();
    let tenant = tenant();
    let otp = definition(tenant, ExtensionPoint::MfaFactor, "otp", "otp", json!({}));
    env.store.put(otp.clone());

    let context = env.context(tenant);
    context.activate().await.unwrap();
    let deployed_at = context.mfa_factors().definition("otp").unwrap().updated_at;

    // Same version again: the UPDATE event fires but reconciliation sees
    // nothing newer than the cached instance.
    env.store.put(otp);

    // Use a second definition as a marker to know the worker got past the
    // stale event.
    env.store.put(definition(
        tenant,
        ExtensionPoint::MfaFactor,
        "otp-marker",
        "otp",
        json!({}),
    ));
    wait_for("marker deployed", || {
        context.mfa_factors().get("otp-marker").is_some()
    })
    .await;

    assert_eq!(
        context.mfa_factors().definition("otp").unwrap().updated_at,
        deployed_at
    );

    context.deactivate().await;
}

#[tokio::test]
async fn undeploying_removes_the_provider() {
    let env = TestEnv::new();
    let tenant = tenant();
    env.store.put(definition(
        tenant,
        ExtensionPoint::AuditReporter,
        "audit-buffered",
        "buffered",
        json!({ "capacity": 16 }),
    ));

    let context = env.context(tenant);
    context.activate().await.unwrap();
    assert!(context.audit_reporters().get("audit-buffered").is_some());

    assert!(env
        .store
        .remove(&tenant, ExtensionPoint::AuditReporter, "audit-buffered"));

    wait_for("reporter undeployed", || {
        context.audit_reporters().get("audit-buffered").is_none()
    })
    .await;

    context.deactivate().await;
}

#[tokio::test]
async fn broken_update_keeps_readiness_honest() {
    let env = TestEnv::new();
    let tenant = tenant();
    let otp = definition(tenant, ExtensionPoint::MfaFactor, "otp", "otp", json!({}));
    env.store.put(otp.clone());

    let context = env.context(tenant);
    context.activate().await.unwrap();

    // Invalid digits: the builder rejects this version.
    env.store.put(
        definition(
            tenant,
            ExtensionPoint::MfaFactor,
            "otp",
            "otp",
            json!({ "digits": 99 }),
        )
        .with_updated_at(otp.updated_at + chrono::Duration::seconds(1)),
    );

    wait_for("failure recorded", || {
        env.readiness
            .latest(&tenant, ExtensionPoint::MfaFactor, "otp")
            .is_some_and(|record| !record.success)
    })
    .await;
    assert!(!env.readiness.is_ready(&tenant));

    context.deactivate().await;
}
