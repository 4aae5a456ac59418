//! Device notifier extension point.
//!
//! Notifiers deliver out-of-band messages to a user's device: MFA codes,
//! login alerts, device registration prompts. Delivery transports (push
//! gateways, SMS, SMTP) register their own builders; the built-in notifier
//! writes to the structured log, which is enough for development and for
//! deployments that ship logs to an external dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use ag_spi::{BuiltProvider, ProviderBuilder, ProviderCatalog, SpiError, SpiResult};

/// A pluggable out-of-band delivery channel.
#[async_trait]
pub trait DeviceNotifier: Send + Sync {
    /// Delivers a message to a recipient.
    ///
    /// The message body may contain one-time codes; implementations must
    /// not persist it beyond delivery.
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> SpiResult<()>;
}

// ============================================================================
// Log notifier
// ============================================================================

#[derive(Debug, Deserialize)]
struct LogNotifierConfig {
    /// Channel label included in every log line.
    #[serde(default = "default_channel")]
    channel: String,
}

fn default_channel() -> String {
    "default".to_string()
}

/// Notifier that writes deliveries to the structured log.
#[derive(Debug)]
pub struct LogNotifier {
    channel: String,
}

#[async_trait]
impl DeviceNotifier for LogNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> SpiResult<()> {
        tracing::info!(
            target: "authgate::notify",
            channel = %self.channel,
            recipient,
            subject,
            body_len = body.len(),
            "notification dispatched"
        );
        Ok(())
    }
}

/// Builder for [`LogNotifier`].
#[derive(Debug, Default)]
pub struct LogNotifierBuilder;

#[async_trait]
impl ProviderBuilder<dyn DeviceNotifier> for LogNotifierBuilder {
    fn provider_type(&self) -> &'static str {
        "log"
    }

    async fn build(
        &self,
        config: &serde_json::Value,
    ) -> SpiResult<BuiltProvider<dyn DeviceNotifier>> {
        let config: LogNotifierConfig =
            serde_json::from_value(config.clone()).map_err(SpiError::invalid_config)?;
        Ok(BuiltProvider::stateless(Arc::new(LogNotifier {
            channel: config.channel,
        })))
    }
}

/// Assembles the catalog of built-in device notifiers.
#[must_use]
pub fn catalog() -> ProviderCatalog<dyn DeviceNotifier> {
    let mut catalog = ProviderCatalog::new();
    catalog.register(Arc::new(LogNotifierBuilder));
    catalog
}
