//! # ag-extensions
//!
//! The gateway's five extension points and their built-in providers.
//!
//! Each module defines the domain trait request-processing code works
//! against, the built-in provider implementations, and a `catalog()`
//! constructor assembling the statically registered
//! [`ProviderCatalog`](ag_spi::ProviderCatalog) for that extension point.
//! Custom deployments extend a catalog by registering additional builders
//! before tenant activation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod audit;
pub mod identity;
pub mod mfa;
pub mod notifier;
pub mod repository;

pub use audit::AuditReporter;
pub use identity::IdentityProvider;
pub use mfa::MfaFactor;
pub use notifier::DeviceNotifier;
pub use repository::Repository;
