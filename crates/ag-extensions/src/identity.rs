//! Identity provider extension point.
//!
//! ## NIST 800-53 Rev5: IA-2 (Identification and Authentication)
//!
//! Identity providers authenticate end-users against a backing directory.
//! Authentication failures are reported without distinguishing "unknown
//! user" from "wrong password" to prevent user enumeration.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use ag_spi::{BuiltProvider, ProviderBuilder, ProviderCatalog, SpiError, SpiResult};

/// An authenticated end-user as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// The login name.
    pub username: String,
    /// Primary email address, when the directory knows one.
    pub email: Option<String>,
    /// Display name, when the directory knows one.
    pub display_name: Option<String>,
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials were valid; the subject is authenticated.
    Granted(Subject),
    /// Credentials were not valid. Deliberately carries no detail.
    Denied,
}

/// A pluggable end-user authentication backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validates a username/password pair.
    ///
    /// The password must never be logged or stored by implementations.
    async fn authenticate(&self, username: &str, password: &str) -> SpiResult<AuthOutcome>;

    /// Looks a user up without authenticating.
    async fn lookup(&self, username: &str) -> SpiResult<Option<Subject>>;
}

// ============================================================================
// Static directory provider
// ============================================================================

#[derive(Debug, Deserialize)]
struct StaticDirectoryConfig {
    users: Vec<StaticUser>,
}

#[derive(Debug, Deserialize)]
struct StaticUser {
    username: String,
    password: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Identity provider backed by users fixed in the definition's
/// configuration.
///
/// Intended for development and for small closed deployments; directory
/// integrations (LDAP, SCIM) register their own builders instead.
#[derive(Debug)]
pub struct StaticDirectoryProvider {
    users: Vec<StaticUser>,
}

impl StaticDirectoryProvider {
    fn find(&self, username: &str) -> Option<&StaticUser> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[async_trait]
impl IdentityProvider for StaticDirectoryProvider {
    async fn authenticate(&self, username: &str, password: &str) -> SpiResult<AuthOutcome> {
        match self.find(username) {
            Some(user) if user.password == password => Ok(AuthOutcome::Granted(Subject {
                username: user.username.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
            })),
            // Unknown user and wrong password are indistinguishable.
            _ => Ok(AuthOutcome::Denied),
        }
    }

    async fn lookup(&self, username: &str) -> SpiResult<Option<Subject>> {
        Ok(self.find(username).map(|user| Subject {
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        }))
    }
}

/// Builder for [`StaticDirectoryProvider`].
#[derive(Debug, Default)]
pub struct StaticDirectoryBuilder;

#[async_trait]
impl ProviderBuilder<dyn IdentityProvider> for StaticDirectoryBuilder {
    fn provider_type(&self) -> &'static str {
        "static-directory"
    }

    async fn build(
        &self,
        config: &serde_json::Value,
    ) -> SpiResult<BuiltProvider<dyn IdentityProvider>> {
        let config: StaticDirectoryConfig =
            serde_json::from_value(config.clone()).map_err(SpiError::invalid_config)?;
        if config.users.is_empty() {
            return Err(SpiError::InvalidConfig(
                "static directory requires at least one user".to_string(),
            ));
        }
        Ok(BuiltProvider::stateless(Arc::new(StaticDirectoryProvider {
            users: config.users,
        })))
    }
}

/// Assembles the catalog of built-in identity providers.
#[must_use]
pub fn catalog() -> ProviderCatalog<dyn IdentityProvider> {
    let mut catalog = ProviderCatalog::new();
    catalog.register(Arc::new(StaticDirectoryBuilder));
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider() -> Arc<dyn IdentityProvider> {
        let config = serde_json::json!({
            "users": [
                { "username": "alice", "password": "s3cret", "email": "alice@example.com" },
                { "username": "bob", "password": "hunter2" }
            ]
        });
        catalog()
            .create("static-directory", &config)
            .await
            .unwrap()
            .provider
    }

    #[tokio::test]
    async fn valid_credentials_are_granted() {
        let provider = provider().await;
        let outcome = provider.authenticate("alice", "s3cret").await.unwrap();
        match outcome {
            AuthOutcome::Granted(subject) => {
                assert_eq!(subject.username, "alice");
                assert_eq!(subject.email.as_deref(), Some("alice@example.com"));
            }
            AuthOutcome::Denied => panic!("expected grant"),
        }
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let provider = provider().await;
        let wrong = provider.authenticate("alice", "nope").await.unwrap();
        let unknown = provider.authenticate("mallory", "nope").await.unwrap();
        assert_eq!(wrong, AuthOutcome::Denied);
        assert_eq!(unknown, AuthOutcome::Denied);
    }

    #[tokio::test]
    async fn lookup_does_not_authenticate() {
        let provider = provider().await;
        let subject = provider.lookup("bob").await.unwrap().unwrap();
        assert_eq!(subject.username, "bob");
        assert!(provider.lookup("mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_directory_is_rejected() {
        let result = catalog()
            .create("static-directory", &serde_json::json!({ "users": [] }))
            .await;
        assert!(matches!(result, Err(SpiError::InvalidConfig(_))));
    }
}
