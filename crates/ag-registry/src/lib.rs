//! # ag-registry
//!
//! The domain-scoped provider registry with event-driven hot reload.
//!
//! One [`ProviderRegistry`] exists per tenant per extension point. It keeps
//! an in-memory, lock-free-readable cache of live provider instances
//! synchronized with the persisted definition store: at startup it
//! bulk-loads every definition for its tenant, and thereafter a dedicated
//! worker consumes deploy/update/undeploy events and reconciles one
//! definition at a time. Request-processing code reads the cache through
//! [`ProviderRegistry::get`] at any time and never blocks on
//! reconciliation.
//!
//! Tenants never share registries, so configuration changes in one tenant
//! can never corrupt another tenant's live traffic.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cache;
pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::ProviderRegistry;
