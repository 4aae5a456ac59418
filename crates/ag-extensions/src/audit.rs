//! Audit reporter extension point.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! Audit reporters receive security-relevant events (authentication
//! attempts, configuration changes, administrative actions) and forward
//! them to an external sink. The buffered reporter is lifecycle-managed:
//! it owns a background drain task that must be started before the
//! reporter is published and stopped when it is undeployed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ag_spi::{
    BuiltProvider, ProviderBuilder, ProviderCatalog, ProviderLifecycle, SpiError, SpiResult,
};

/// A security-relevant event to be audited.
///
/// ## NIST 800-53 Rev5: AU-3 (Content of Audit Records)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the event occurred.
    pub at: DateTime<Utc>,
    /// Who performed the action.
    pub actor: String,
    /// What was done.
    pub action: String,
    /// Whether the action succeeded.
    pub success: bool,
    /// Additional context, free-form.
    pub detail: Option<String>,
}

impl AuditEntry {
    /// Creates an entry timestamped now.
    #[must_use]
    pub fn new(actor: impl Into<String>, action: impl Into<String>, success: bool) -> Self {
        Self {
            at: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            success,
            detail: None,
        }
    }

    /// Attaches free-form detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A pluggable audit event sink.
#[async_trait]
pub trait AuditReporter: Send + Sync {
    /// Accepts one audit entry for delivery.
    async fn report(&self, entry: AuditEntry) -> SpiResult<()>;
}

// ============================================================================
// Log reporter
// ============================================================================

/// Reporter that writes entries synchronously to the structured log.
#[derive(Debug, Default)]
pub struct LogAuditReporter;

#[async_trait]
impl AuditReporter for LogAuditReporter {
    async fn report(&self, entry: AuditEntry) -> SpiResult<()> {
        tracing::info!(
            target: "authgate::audit",
            actor = %entry.actor,
            action = %entry.action,
            success = entry.success,
            detail = entry.detail.as_deref().unwrap_or(""),
            "audit event"
        );
        Ok(())
    }
}

/// Builder for [`LogAuditReporter`].
#[derive(Debug, Default)]
pub struct LogAuditBuilder;

#[async_trait]
impl ProviderBuilder<dyn AuditReporter> for LogAuditBuilder {
    fn provider_type(&self) -> &'static str {
        "log"
    }

    async fn build(
        &self,
        _config: &serde_json::Value,
    ) -> SpiResult<BuiltProvider<dyn AuditReporter>> {
        Ok(BuiltProvider::stateless(Arc::new(LogAuditReporter)))
    }
}

// ============================================================================
// Buffered reporter (lifecycle-managed)
// ============================================================================

#[derive(Debug, Deserialize)]
struct BufferedAuditConfig {
    /// Queue capacity; `report` applies backpressure once full.
    #[serde(default = "default_capacity")]
    capacity: usize,
}

const fn default_capacity() -> usize {
    256
}

/// Reporter that queues entries and drains them from a background task.
///
/// Lifecycle-managed: `start` spawns the drain task, `stop` closes the
/// queue and waits for the remaining entries to be written out, so an
/// undeploy never loses accepted entries.
pub struct BufferedAuditReporter {
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<AuditEntry>>>,
    drain_task: Mutex<Option<JoinHandle<()>>>,
    drained: Arc<AtomicU64>,
}

impl BufferedAuditReporter {
    /// Creates a reporter with the given queue capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sender: Mutex::new(None),
            drain_task: Mutex::new(None),
            drained: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns how many entries the drain task has written out.
    #[must_use]
    pub fn drained(&self) -> u64 {
        self.drained.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditReporter for BufferedAuditReporter {
    async fn report(&self, entry: AuditEntry) -> SpiResult<()> {
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or_else(|| SpiError::Lifecycle("audit reporter is not started".to_string()))?;
        sender
            .send(entry)
            .await
            .map_err(|_| SpiError::Lifecycle("audit reporter is stopped".to_string()))
    }
}

#[async_trait]
impl ProviderLifecycle for BufferedAuditReporter {
    async fn start(&self) -> SpiResult<()> {
        let mut sender = self.sender.lock();
        if sender.is_some() {
            return Err(SpiError::Lifecycle(
                "audit reporter already started".to_string(),
            ));
        }
        let (tx, mut rx) = mpsc::channel::<AuditEntry>(self.capacity);
        *sender = Some(tx);
        drop(sender);

        let drained = Arc::clone(&self.drained);
        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                tracing::info!(
                    target: "authgate::audit",
                    actor = %entry.actor,
                    action = %entry.action,
                    success = entry.success,
                    detail = entry.detail.as_deref().unwrap_or(""),
                    "audit event"
                );
                drained.fetch_add(1, Ordering::SeqCst);
            }
        });
        *self.drain_task.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> SpiResult<()> {
        // Closing the sender lets the drain task finish the queue.
        self.sender.lock().take();
        let task = self.drain_task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| SpiError::Lifecycle(format!("drain task failed: {e}")))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BufferedAuditReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedAuditReporter")
            .field("capacity", &self.capacity)
            .field("drained", &self.drained())
            .finish_non_exhaustive()
    }
}

/// Builder for [`BufferedAuditReporter`].
#[derive(Debug, Default)]
pub struct BufferedAuditBuilder;

#[async_trait]
impl ProviderBuilder<dyn AuditReporter> for BufferedAuditBuilder {
    fn provider_type(&self) -> &'static str {
        "buffered"
    }

    async fn build(
        &self,
        config: &serde_json::Value,
    ) -> SpiResult<BuiltProvider<dyn AuditReporter>> {
        let config: BufferedAuditConfig =
            serde_json::from_value(config.clone()).map_err(SpiError::invalid_config)?;
        if config.capacity == 0 {
            return Err(SpiError::InvalidConfig(
                "buffered audit capacity must be positive".to_string(),
            ));
        }
        let reporter = Arc::new(BufferedAuditReporter::new(config.capacity));
        Ok(BuiltProvider::managed(
            Arc::clone(&reporter) as Arc<dyn AuditReporter>,
            reporter,
        ))
    }
}

/// Assembles the catalog of built-in audit reporters.
#[must_use]
pub fn catalog() -> ProviderCatalog<dyn AuditReporter> {
    let mut catalog = ProviderCatalog::new();
    catalog.register(Arc::new(LogAuditBuilder));
    catalog.register(Arc::new(BufferedAuditBuilder));
    catalog
}
