//! MFA factor extension point.
//!
//! ## NIST 800-53 Rev5: IA-2(1) (Multi-Factor Authentication)
//!
//! A factor issues a challenge for a subject and later verifies the
//! subject's response. Challenges are single-use and expire.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Deserialize;

use ag_spi::{BuiltProvider, ProviderBuilder, ProviderCatalog, SpiError, SpiResult};

/// An issued challenge.
///
/// The code is returned to the authentication flow, which dispatches it to
/// the subject through a device notifier; it is never shown to the
/// requesting client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// The code the subject must present.
    pub code: String,
    /// When the challenge stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// A pluggable second authentication factor.
#[async_trait]
pub trait MfaFactor: Send + Sync {
    /// Issues a new challenge for a subject, superseding any pending one.
    async fn begin_challenge(&self, subject: &str) -> SpiResult<Challenge>;

    /// Verifies a subject's response.
    ///
    /// Returns `true` exactly once per challenge: a verified or expired
    /// challenge is consumed.
    async fn verify(&self, subject: &str, code: &str) -> SpiResult<bool>;
}

// ============================================================================
// One-time-password factor
// ============================================================================

#[derive(Debug, Deserialize)]
struct OtpConfig {
    #[serde(default = "default_digits")]
    digits: u32,
    #[serde(default = "default_ttl_secs")]
    ttl_secs: i64,
}

const fn default_digits() -> u32 {
    6
}

const fn default_ttl_secs() -> i64 {
    300
}

#[derive(Debug, Clone)]
struct PendingChallenge {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Random numeric one-time-password factor.
#[derive(Debug)]
pub struct OtpFactor {
    digits: u32,
    ttl: Duration,
    pending: DashMap<String, PendingChallenge>,
}

impl OtpFactor {
    fn generate_code(&self) -> String {
        let max = 10u64.saturating_pow(self.digits);
        let value = rand::thread_rng().gen_range(0..max);
        format!("{value:0width$}", width = self.digits as usize)
    }
}

#[async_trait]
impl MfaFactor for OtpFactor {
    async fn begin_challenge(&self, subject: &str) -> SpiResult<Challenge> {
        let challenge = Challenge {
            code: self.generate_code(),
            expires_at: Utc::now() + self.ttl,
        };
        self.pending.insert(
            subject.to_string(),
            PendingChallenge {
                code: challenge.code.clone(),
                expires_at: challenge.expires_at,
            },
        );
        Ok(challenge)
    }

    async fn verify(&self, subject: &str, code: &str) -> SpiResult<bool> {
        // Consumed on every attempt: a wrong guess invalidates the
        // pending challenge rather than allowing unlimited retries.
        let Some((_, pending)) = self.pending.remove(subject) else {
            return Ok(false);
        };
        if pending.expires_at < Utc::now() {
            return Ok(false);
        }
        Ok(pending.code == code)
    }
}

/// Builder for [`OtpFactor`].
#[derive(Debug, Default)]
pub struct OtpFactorBuilder;

#[async_trait]
impl ProviderBuilder<dyn MfaFactor> for OtpFactorBuilder {
    fn provider_type(&self) -> &'static str {
        "otp"
    }

    async fn build(&self, config: &serde_json::Value) -> SpiResult<BuiltProvider<dyn MfaFactor>> {
        let config: OtpConfig =
            serde_json::from_value(config.clone()).map_err(SpiError::invalid_config)?;
        if !(4..=10).contains(&config.digits) {
            return Err(SpiError::InvalidConfig(format!(
                "otp digits must be between 4 and 10, got {}",
                config.digits
            )));
        }
        if config.ttl_secs <= 0 {
            return Err(SpiError::InvalidConfig(
                "otp ttl_secs must be positive".to_string(),
            ));
        }
        Ok(BuiltProvider::stateless(Arc::new(OtpFactor {
            digits: config.digits,
            ttl: Duration::seconds(config.ttl_secs),
            pending: DashMap::new(),
        })))
    }
}

/// Assembles the catalog of built-in MFA factors.
#[must_use]
pub fn catalog() -> ProviderCatalog<dyn MfaFactor> {
    let mut catalog = ProviderCatalog::new();
    catalog.register(Arc::new(OtpFactorBuilder));
    catalog
}
