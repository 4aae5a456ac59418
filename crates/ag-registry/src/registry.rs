//! The per-tenant provider registry.
//!
//! ## NIST 800-53 Rev5: CM-3 (Configuration Change Control)
//!
//! Provider configuration changes take effect at runtime through an
//! auditable reconciliation path: every deploy attempt is recorded in the
//! readiness sink, and a change to one definition can never disturb the
//! instances deployed for other definitions or other tenants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use ag_core::{RetryPolicy, TenantRef};
use ag_spi::{
    Definition, DefinitionStore, EventChannel, EventKind, EventSubscription, ExtensionEvent,
    ExtensionPoint, ProviderCatalog, ReadinessRecord, ReadinessSink,
};

use crate::cache::{CachedProvider, ProviderCache};
use crate::error::{RegistryError, RegistryResult};

/// Handle to the reconciliation worker of a running registry.
struct Worker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A domain-scoped registry of live provider instances for one extension
/// point.
///
/// `P` is the extension point's domain trait object. The registry owns the
/// instances in its cache exclusively: their resources are released only
/// through the registry's own undeploy and stop paths, never by external
/// code reaching into the cache.
///
/// ## Concurrency
///
/// A single worker per registry consumes the event subscription, so events
/// are reconciled strictly in delivery order and reconciliations for one
/// id can never overtake each other. Lookups read the concurrent cache
/// directly and never suspend.
pub struct ProviderRegistry<P: ?Sized + Send + Sync + 'static> {
    tenant: TenantRef,
    extension: ExtensionPoint,
    store: Arc<dyn DefinitionStore>,
    channel: Arc<dyn EventChannel>,
    catalog: Arc<ProviderCatalog<P>>,
    readiness: Arc<dyn ReadinessSink>,
    cache: ProviderCache<P>,
    started: AtomicBool,
    stopped: AtomicBool,
    worker: Mutex<Option<Worker>>,
}

impl<P: ?Sized + Send + Sync + 'static> ProviderRegistry<P> {
    /// Creates a registry for one tenant and extension point.
    ///
    /// The registry does nothing until [`start`](Self::start) or
    /// [`start_critical`](Self::start_critical) is called.
    #[must_use]
    pub fn new(
        tenant: TenantRef,
        extension: ExtensionPoint,
        store: Arc<dyn DefinitionStore>,
        channel: Arc<dyn EventChannel>,
        catalog: Arc<ProviderCatalog<P>>,
        readiness: Arc<dyn ReadinessSink>,
    ) -> Self {
        Self {
            tenant,
            extension,
            store,
            channel,
            catalog,
            readiness,
            cache: ProviderCache::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    /// Returns the tenant this registry serves.
    #[must_use]
    pub const fn tenant(&self) -> &TenantRef {
        &self.tenant
    }

    /// Returns the extension point this registry serves.
    #[must_use]
    pub const fn extension(&self) -> ExtensionPoint {
        self.extension
    }

    // === Lookup ===

    /// Returns the active provider for a definition id.
    ///
    /// Synchronous and non-blocking: reads the current cache snapshot and
    /// never triggers a fetch or waits for in-flight reconciliation.
    /// `None` means the extension is not currently available for this
    /// tenant; callers apply their own fallback policy.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<P>> {
        self.cache.get(id)
    }

    /// Returns a snapshot of all active providers.
    ///
    /// Used where an extension point is enumerated rather than addressed
    /// by id, for example aggregating keys across certificate providers.
    #[must_use]
    pub fn get_all(&self) -> Vec<(String, Arc<P>)> {
        self.cache.get_all()
    }

    /// Returns the last successfully applied definition for an id.
    #[must_use]
    pub fn definition(&self, id: &str) -> Option<Definition> {
        self.cache.definition(id)
    }

    /// Returns the number of active providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns whether no providers are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    // === Lifecycle ===

    /// Starts the registry: subscribes to configuration events, bulk-loads
    /// all definitions for the tenant, then hands the subscription to the
    /// reconciliation worker.
    ///
    /// Individual definitions that fail to deploy are recorded in the
    /// readiness sink and do not abort the rest of the bulk load.
    ///
    /// ## Errors
    ///
    /// Fails with [`RegistryError::AlreadyStarted`] when called on a
    /// running registry, or [`RegistryError::BulkLoad`] when the
    /// definition store cannot be enumerated at all.
    pub async fn start(self: &Arc<Self>) -> RegistryResult<()> {
        self.start_inner(None).await
    }

    /// Starts the registry as bootstrap-critical: each definition that
    /// fails to deploy is retried with the bounded backoff `policy`, and
    /// exhausting the policy fails startup hard.
    ///
    /// This runs once, off the request-serving path, during tenant
    /// activation. Steady-state reconciliation never retries.
    ///
    /// ## Errors
    ///
    /// In addition to the [`start`](Self::start) errors, fails with
    /// [`RegistryError::BootstrapExhausted`] when a definition cannot be
    /// deployed within `policy.max_attempts`. On failure, definitions
    /// deployed before the failing one are stopped and dropped; the
    /// registry is left stopped and startable again.
    pub async fn start_critical(self: &Arc<Self>, policy: &RetryPolicy) -> RegistryResult<()> {
        self.start_inner(Some(policy)).await
    }

    async fn start_inner(self: &Arc<Self>, retry: Option<&RetryPolicy>) -> RegistryResult<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RegistryError::AlreadyStarted);
        }
        self.stopped.store(false, Ordering::SeqCst);

        // Subscribe before bulk-loading so no change notification can be
        // missed between the load and the worker taking over.
        let subscription = self.channel.subscribe(&self.tenant, self.extension);

        if let Err(error) = self.bulk_load(retry).await {
            // A failed start must not leave earlier deployments live.
            for (id, cached) in self.cache.drain() {
                self.stop_instance(&id, &cached).await;
            }
            self.started.store(false, Ordering::SeqCst);
            return Err(error);
        }

        self.spawn_worker(subscription);
        tracing::info!(
            tenant = %self.tenant,
            extension = %self.extension,
            providers = self.cache.len(),
            "provider registry started"
        );
        Ok(())
    }

    /// Stops the registry: shuts the worker down (unsubscribing), stops
    /// every lifecycle-managed cached instance, and clears the cache.
    ///
    /// Errors stopping an individual instance are logged and do not
    /// prevent stopping the others. Safe to call on a registry that was
    /// never started.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            // The worker finishes its in-flight reconciliation before it
            // observes the shutdown signal; joining it here means no
            // reconciliation can publish into the cleared cache.
            let _ = worker.shutdown.send(());
            if let Err(error) = worker.handle.await {
                tracing::warn!(
                    tenant = %self.tenant,
                    extension = %self.extension,
                    %error,
                    "reconciliation worker did not shut down cleanly"
                );
            }
        }

        for (id, cached) in self.cache.drain() {
            self.stop_instance(&id, &cached).await;
        }

        self.started.store(false, Ordering::SeqCst);
        tracing::info!(
            tenant = %self.tenant,
            extension = %self.extension,
            "provider registry stopped"
        );
    }

    // === Bulk load ===

    async fn bulk_load(&self, retry: Option<&RetryPolicy>) -> RegistryResult<()> {
        let mut definitions = self
            .store
            .find_all(&self.tenant, self.extension)
            .await
            .map_err(RegistryError::BulkLoad)?;

        while let Some(item) = definitions.next().await {
            let definition = match item {
                Ok(definition) => definition,
                Err(error) => {
                    if retry.is_some() {
                        return Err(RegistryError::BulkLoad(error));
                    }
                    tracing::warn!(
                        tenant = %self.tenant,
                        extension = %self.extension,
                        %error,
                        "skipping unreadable definition during bulk load"
                    );
                    continue;
                }
            };

            match retry {
                Some(policy) => self.apply_with_retry(&definition, policy).await?,
                None => {
                    if let Err(error) = self.apply(&definition).await {
                        tracing::warn!(
                            tenant = %self.tenant,
                            extension = %self.extension,
                            id = %definition.id,
                            %error,
                            "provider failed to deploy during bulk load"
                        );
                        self.readiness.report(ReadinessRecord::failure(
                            self.tenant,
                            self.extension,
                            &definition.id,
                            &definition.name,
                            error.to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    async fn apply_with_retry(
        &self,
        definition: &Definition,
        policy: &RetryPolicy,
    ) -> RegistryResult<()> {
        let mut attempt: u32 = 1;
        loop {
            match self.apply(definition).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        tenant = %self.tenant,
                        extension = %self.extension,
                        id = %definition.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "bootstrap deployment failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    self.readiness.report(ReadinessRecord::failure(
                        self.tenant,
                        self.extension,
                        &definition.id,
                        &definition.name,
                        error.to_string(),
                    ));
                    return Err(RegistryError::BootstrapExhausted {
                        id: definition.id.clone(),
                        attempts: attempt,
                        message: error.to_string(),
                    });
                }
            }
        }
    }

    // === Reconciliation ===

    fn spawn_worker(self: &Arc<Self>, mut subscription: EventSubscription) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let registry = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = subscription.recv() => match event {
                        Some(event) => registry.reconcile(event).await,
                        None => {
                            tracing::debug!(
                                tenant = %registry.tenant,
                                extension = %registry.extension,
                                "event channel closed"
                            );
                            break;
                        }
                    },
                }
            }
        });
        *self.worker.lock() = Some(Worker {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Brings the cached instance for one event's definition id up to date.
    async fn reconcile(&self, event: ExtensionEvent) {
        // The channel already filters; this guard is what makes tenant
        // isolation independent of channel implementations.
        if event.tenant != self.tenant || event.extension != self.extension {
            return;
        }
        match event.kind {
            EventKind::Undeploy => self.undeploy(&event.id).await,
            EventKind::Deploy | EventKind::Update => self.deploy(&event.id).await,
        }
    }

    /// Removes a definition's instance. Idempotent; no version check is
    /// needed because removal is unconditional.
    async fn undeploy(&self, id: &str) {
        if let Some(cached) = self.cache.remove(id) {
            self.stop_instance(id, &cached).await;
            tracing::info!(
                tenant = %self.tenant,
                extension = %self.extension,
                id,
                "provider undeployed"
            );
        }
    }

    /// Fetches the current definition for an id and deploys it when newer
    /// than the cached version.
    async fn deploy(&self, id: &str) {
        let fetched = match self.store.find_by_id(&self.tenant, self.extension, id).await {
            Ok(Some(definition)) => definition,
            Ok(None) => {
                // Deleted between the event firing and the fetch.
                tracing::debug!(
                    tenant = %self.tenant,
                    extension = %self.extension,
                    id,
                    "definition no longer exists, skipping"
                );
                return;
            }
            Err(error) => {
                tracing::warn!(
                    tenant = %self.tenant,
                    extension = %self.extension,
                    id,
                    %error,
                    "definition fetch failed, abandoning reconciliation"
                );
                return;
            }
        };

        if !self.cache.needs_deployment(&fetched) {
            tracing::debug!(
                tenant = %self.tenant,
                extension = %self.extension,
                id,
                "definition already current"
            );
            return;
        }

        if let Err(error) = self.apply(&fetched).await {
            tracing::warn!(
                tenant = %self.tenant,
                extension = %self.extension,
                id,
                %error,
                "provider deployment failed"
            );
            // A definition that can no longer be instantiated must not be
            // served from a stale instance.
            if let Some(old) = self.cache.remove(&fetched.id) {
                self.stop_instance(&fetched.id, &old).await;
            }
            self.readiness.report(ReadinessRecord::failure(
                self.tenant,
                self.extension,
                &fetched.id,
                &fetched.name,
                error.to_string(),
            ));
        }
    }

    /// Builds, starts and publishes an instance for one definition.
    async fn apply(&self, definition: &Definition) -> ag_spi::SpiResult<()> {
        let built = self
            .catalog
            .create(&definition.provider_type, &definition.config)
            .await?;

        if let Some(lifecycle) = &built.lifecycle {
            lifecycle.start().await?;
        }

        if self.stopped.load(Ordering::SeqCst) {
            // The registry stopped while this instance was being built;
            // publishing it now would re-populate a cleared cache.
            if let Some(lifecycle) = &built.lifecycle {
                if let Err(error) = lifecycle.stop().await {
                    tracing::warn!(
                        tenant = %self.tenant,
                        id = %definition.id,
                        %error,
                        "failed to stop instance built after registry shutdown"
                    );
                }
            }
            return Ok(());
        }

        let displaced = self.cache.insert(definition.clone(), built);
        if let Some(old) = displaced {
            // Always stop the superseded instance; replacing without
            // stopping leaks its resources.
            self.stop_instance(&definition.id, &old).await;
        }

        self.readiness.report(ReadinessRecord::success(
            self.tenant,
            self.extension,
            &definition.id,
            &definition.name,
        ));
        tracing::info!(
            tenant = %self.tenant,
            extension = %self.extension,
            id = %definition.id,
            provider_type = %definition.provider_type,
            "provider deployed"
        );
        Ok(())
    }

    async fn stop_instance(&self, id: &str, cached: &CachedProvider<P>) {
        if let Some(lifecycle) = &cached.lifecycle {
            if let Err(error) = lifecycle.stop().await {
                tracing::warn!(
                    tenant = %self.tenant,
                    extension = %self.extension,
                    id,
                    %error,
                    "provider stop failed"
                );
            }
        }
    }
}

impl<P: ?Sized + Send + Sync + 'static> std::fmt::Debug for ProviderRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("tenant", &self.tenant)
            .field("extension", &self.extension)
            .field("providers", &self.cache.len())
            .finish_non_exhaustive()
    }
}
