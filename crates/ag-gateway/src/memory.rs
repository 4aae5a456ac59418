//! In-process definition store and event channel.
//!
//! These back development, tests, and single-node deployments. The store
//! doubles as the administrative write surface: saving or removing a
//! definition publishes the matching event through the channel, which is
//! exactly what a persistence-backed store would do via its change feed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream;
use tokio::sync::mpsc;

use ag_core::TenantRef;
use ag_spi::{
    Definition, DefinitionStore, DefinitionStream, EventChannel, EventKind, EventSubscription,
    ExtensionEvent, ExtensionPoint, SpiError, SpiResult,
};

/// In-process event channel with per-(tenant, extension) routing.
#[derive(Debug, Default)]
pub struct MemoryEventChannel {
    subscribers: DashMap<(TenantRef, ExtensionPoint), Vec<mpsc::UnboundedSender<ExtensionEvent>>>,
}

impl MemoryEventChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an event to every live subscription matching its tenant
    /// and extension point. Dropped subscriptions are pruned here.
    pub fn publish(&self, event: &ExtensionEvent) {
        if let Some(mut subscribers) = self.subscribers.get_mut(&(event.tenant, event.extension)) {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Returns the number of live subscriptions for one scope.
    #[must_use]
    pub fn subscriber_count(&self, tenant: &TenantRef, extension: ExtensionPoint) -> usize {
        self.subscribers
            .get(&(*tenant, extension))
            .map_or(0, |subs| subs.len())
    }
}

impl EventChannel for MemoryEventChannel {
    fn subscribe(&self, tenant: &TenantRef, extension: ExtensionPoint) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .entry((*tenant, extension))
            .or_default()
            .push(tx);
        EventSubscription::new(rx)
    }
}

/// In-process definition store that publishes change events.
pub struct MemoryDefinitionStore {
    definitions: DashMap<(TenantRef, ExtensionPoint), HashMap<String, Definition>>,
    channel: Arc<MemoryEventChannel>,
}

impl MemoryDefinitionStore {
    /// Creates an empty store publishing through the given channel.
    #[must_use]
    pub fn new(channel: Arc<MemoryEventChannel>) -> Self {
        Self {
            definitions: DashMap::new(),
            channel,
        }
    }

    /// Saves a definition and publishes DEPLOY or UPDATE accordingly.
    pub fn put(&self, definition: Definition) {
        let key = (definition.tenant, definition.extension);
        let previous = self
            .definitions
            .entry(key)
            .or_default()
            .insert(definition.id.clone(), definition.clone());

        let kind = if previous.is_some() {
            EventKind::Update
        } else {
            EventKind::Deploy
        };
        self.channel.publish(&ExtensionEvent::new(
            kind,
            definition.id,
            definition.tenant,
            definition.extension,
        ));
    }

    /// Removes a definition and publishes UNDEPLOY when it existed.
    pub fn remove(&self, tenant: &TenantRef, extension: ExtensionPoint, id: &str) -> bool {
        let removed = self
            .definitions
            .get_mut(&(*tenant, extension))
            .is_some_and(|mut scoped| scoped.remove(id).is_some());
        if removed {
            self.channel.publish(&ExtensionEvent::new(
                EventKind::Undeploy,
                id,
                *tenant,
                extension,
            ));
        }
        removed
    }
}

#[async_trait]
impl DefinitionStore for MemoryDefinitionStore {
    async fn find_all(
        &self,
        tenant: &TenantRef,
        extension: ExtensionPoint,
    ) -> SpiResult<DefinitionStream> {
        let mut definitions: Vec<Definition> = self
            .definitions
            .get(&(*tenant, extension))
            .map(|scoped| scoped.values().cloned().collect())
            .unwrap_or_default();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Box::pin(stream::iter(
            definitions.into_iter().map(Ok::<Definition, SpiError>),
        )))
    }

    async fn find_by_id(
        &self,
        tenant: &TenantRef,
        extension: ExtensionPoint,
        id: &str,
    ) -> SpiResult<Option<Definition>> {
        Ok(self
            .definitions
            .get(&(*tenant, extension))
            .and_then(|scoped| scoped.get(id).cloned()))
    }
}

impl std::fmt::Debug for MemoryDefinitionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDefinitionStore")
            .field("scopes", &self.definitions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use uuid::Uuid;

    fn definition(tenant: TenantRef, id: &str) -> Definition {
        Definition::new(
            id,
            "Test",
            "log",
            serde_json::json!({}),
            tenant,
            ExtensionPoint::DeviceNotifier,
        )
    }

    #[tokio::test]
    async fn put_publishes_deploy_then_update() {
        let channel = Arc::new(MemoryEventChannel::new());
        let store = MemoryDefinitionStore::new(Arc::clone(&channel));
        let tenant = TenantRef::domain(Uuid::now_v7());
        let mut subscription = channel.subscribe(&tenant, ExtensionPoint::DeviceNotifier);

        let def = definition(tenant, "n1");
        store.put(def.clone());
        store.put(def.with_updated_at(chrono::Utc::now()));

        assert_eq!(subscription.recv().await.unwrap().kind, EventKind::Deploy);
        assert_eq!(subscription.recv().await.unwrap().kind, EventKind::Update);
    }

    #[tokio::test]
    async fn remove_publishes_undeploy_only_when_present() {
        let channel = Arc::new(MemoryEventChannel::new());
        let store = MemoryDefinitionStore::new(Arc::clone(&channel));
        let tenant = TenantRef::domain(Uuid::now_v7());
        let mut subscription = channel.subscribe(&tenant, ExtensionPoint::DeviceNotifier);

        assert!(!store.remove(&tenant, ExtensionPoint::DeviceNotifier, "missing"));

        store.put(definition(tenant, "n1"));
        assert!(store.remove(&tenant, ExtensionPoint::DeviceNotifier, "n1"));

        assert_eq!(subscription.recv().await.unwrap().kind, EventKind::Deploy);
        assert_eq!(subscription.recv().await.unwrap().kind, EventKind::Undeploy);
    }

    #[tokio::test]
    async fn events_are_scoped_to_tenant_and_extension() {
        let channel = Arc::new(MemoryEventChannel::new());
        let store = MemoryDefinitionStore::new(Arc::clone(&channel));
        let a = TenantRef::domain(Uuid::now_v7());
        let b = TenantRef::domain(Uuid::now_v7());

        let mut sub_a = channel.subscribe(&a, ExtensionPoint::DeviceNotifier);

        store.put(definition(b, "n1"));
        store.put(definition(a, "n2"));

        // Only tenant A's event arrives on A's subscription.
        let event = sub_a.recv().await.unwrap();
        assert_eq!(event.tenant, a);
        assert_eq!(event.id, "n2");
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned_on_publish() {
        let channel = Arc::new(MemoryEventChannel::new());
        let tenant = TenantRef::domain(Uuid::now_v7());
        let point = ExtensionPoint::MfaFactor;

        let subscription = channel.subscribe(&tenant, point);
        assert_eq!(channel.subscriber_count(&tenant, point), 1);
        drop(subscription);

        channel.publish(&ExtensionEvent::new(EventKind::Deploy, "m1", tenant, point));
        assert_eq!(channel.subscriber_count(&tenant, point), 0);
    }

    #[tokio::test]
    async fn find_all_streams_scoped_definitions() {
        let channel = Arc::new(MemoryEventChannel::new());
        let store = MemoryDefinitionStore::new(channel);
        let tenant = TenantRef::domain(Uuid::now_v7());
        let other = TenantRef::domain(Uuid::now_v7());

        store.put(definition(tenant, "n2"));
        store.put(definition(tenant, "n1"));
        store.put(definition(other, "n3"));

        let mut stream = store
            .find_all(&tenant, ExtensionPoint::DeviceNotifier)
            .await
            .unwrap();
        let mut ids = Vec::new();
        while let Some(item) = stream.next().await {
            ids.push(item.unwrap().id);
        }
        assert_eq!(ids, vec!["n1", "n2"]);

        let found = store
            .find_by_id(&tenant, ExtensionPoint::DeviceNotifier, "n1")
            .await
            .unwrap();
        assert!(found.is_some());
        let foreign = store
            .find_by_id(&other, ExtensionPoint::DeviceNotifier, "n1")
            .await
            .unwrap();
        assert!(foreign.is_none());
    }
}
