//! Configuration change events.
//!
//! Deploy, update and undeploy notifications are delivered as a typed
//! message queue per subscriber: one registry owns one subscription and
//! consumes it from a single worker, so events for a given definition id
//! are always processed in publish order. Dropping the subscription is the
//! unsubscribe operation; publishers prune closed subscriptions.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use ag_core::TenantRef;

use crate::extension::ExtensionPoint;

/// The kind of configuration change an event announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A definition was created.
    Deploy,
    /// An existing definition was changed.
    Update,
    /// A definition was removed.
    Undeploy,
}

/// A tenant-scoped configuration change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionEvent {
    /// What happened.
    pub kind: EventKind,
    /// The affected definition id.
    pub id: String,
    /// The tenant the definition belongs to.
    pub tenant: TenantRef,
    /// The extension point the definition configures.
    pub extension: ExtensionPoint,
}

impl ExtensionEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(
        kind: EventKind,
        id: impl Into<String>,
        tenant: TenantRef,
        extension: ExtensionPoint,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            tenant,
            extension,
        }
    }
}

/// One subscriber's end of the event channel.
///
/// Delivers only events matching the tenant and extension point the
/// subscription was created for, strictly in publish order.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: mpsc::UnboundedReceiver<ExtensionEvent>,
}

impl EventSubscription {
    /// Wraps a receiver produced by an [`EventChannel`] implementation.
    #[must_use]
    pub fn new(receiver: mpsc::UnboundedReceiver<ExtensionEvent>) -> Self {
        Self { receiver }
    }

    /// Receives the next event, or `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<ExtensionEvent> {
        self.receiver.recv().await
    }
}

/// Source of configuration change notifications.
///
/// Implementations route each published event to every subscription whose
/// tenant and extension point match. Subscribing must be cheap and
/// synchronous; delivery is asynchronous.
pub trait EventChannel: Send + Sync {
    /// Subscribes to events for one tenant and extension point.
    fn subscribe(&self, tenant: &TenantRef, extension: ExtensionPoint) -> EventSubscription;
}
