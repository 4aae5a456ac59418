//! Provider lifecycle capability.
//!
//! Some extension points produce providers that hold resources (open
//! connections, background tasks) which must be explicitly released;
//! others are plain values where construction alone is enough. Rather than
//! hard-coding which extension points are which, lifecycle-awareness is an
//! explicit capability the builder declares per provider type: a built
//! provider either carries a lifecycle handle or it does not, and the
//! registry applies the same start-before-publish / stop-before-discard
//! policy whenever the handle is present.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SpiResult;

/// Lifecycle hooks for providers that hold resources.
#[async_trait]
pub trait ProviderLifecycle: Send + Sync {
    /// Starts the provider.
    ///
    /// Called exactly once, before the instance becomes visible to
    /// request-processing code. A failed start means the instance is
    /// discarded and never published.
    async fn start(&self) -> SpiResult<()>;

    /// Stops the provider, releasing its resources.
    ///
    /// Called exactly once, after the instance has been removed from the
    /// registry cache (or was never published).
    async fn stop(&self) -> SpiResult<()>;
}

/// A provider instance as returned by a builder.
///
/// `P` is the extension point's domain trait object (for example
/// `dyn AuditReporter`). The lifecycle handle, when present, points at the
/// same underlying object.
pub struct BuiltProvider<P: ?Sized> {
    /// The live provider instance.
    pub provider: Arc<P>,
    /// Lifecycle handle, present only for lifecycle-managed providers.
    pub lifecycle: Option<Arc<dyn ProviderLifecycle>>,
}

impl<P: ?Sized> BuiltProvider<P> {
    /// Wraps a provider whose construction alone is sufficient.
    #[must_use]
    pub fn stateless(provider: Arc<P>) -> Self {
        Self {
            provider,
            lifecycle: None,
        }
    }

    /// Wraps a provider that must be started and stopped.
    ///
    /// The lifecycle handle is expected to reference the same object as
    /// `provider`.
    #[must_use]
    pub fn managed(provider: Arc<P>, lifecycle: Arc<dyn ProviderLifecycle>) -> Self {
        Self {
            provider,
            lifecycle: Some(lifecycle),
        }
    }

    /// Returns whether this provider declared the lifecycle capability.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.lifecycle.is_some()
    }
}

impl<P: ?Sized> Clone for BuiltProvider<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<P: ?Sized> std::fmt::Debug for BuiltProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltProvider")
            .field("managed", &self.is_managed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        starts: AtomicUsize,
    }

    #[async_trait]
    impl ProviderLifecycle for Probe {
        async fn start(&self) -> SpiResult<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> SpiResult<()> {
            Ok(())
        }
    }

    #[test]
    fn stateless_provider_has_no_lifecycle() {
        let built: BuiltProvider<str> = BuiltProvider::stateless(Arc::from("p"));
        assert!(!built.is_managed());
    }

    #[tokio::test]
    async fn managed_provider_exposes_lifecycle() {
        let probe = Arc::new(Probe {
            starts: AtomicUsize::new(0),
        });
        let built: BuiltProvider<Probe> = BuiltProvider::managed(Arc::clone(&probe), probe.clone());

        assert!(built.is_managed());
        built.lifecycle.as_ref().unwrap().start().await.unwrap();
        assert_eq!(probe.starts.load(Ordering::SeqCst), 1);
    }
}
