//! Gateway configuration.
//!
//! Plain serde structures with sane defaults. Configuration is loaded by
//! the embedding process (file, environment, CLI) and passed down as
//! values; no ambient global configuration exists anywhere in the gateway.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for one gateway process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Retry policy applied while deploying bootstrap-critical providers.
    pub bootstrap: RetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bootstrap: RetryPolicy::default(),
        }
    }
}

/// Bounded exponential backoff policy.
///
/// Used when deploying the repository extension point at startup: the
/// gateway has no useful behavior without its repositories, so failed
/// deployments are retried, but only up to `max_attempts` before startup
/// fails hard. An unbounded retry loop is deliberately not supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub multiplier: u32,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay_ms: 250,
            multiplier: 2,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay to sleep after the given failed attempt.
    ///
    /// Attempts are counted from 1. The delay grows geometrically and is
    /// capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        let millis = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}
