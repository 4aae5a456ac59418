//! # ag-spi
//!
//! Service Provider Interface (SPI) traits for Authgate extensibility.
//!
//! Each tenant configures which plugin-backed provider is active for each
//! extension point (identity providers, MFA factors, device notifiers,
//! audit reporters, repositories). This crate defines the contracts the
//! per-tenant registries are built on:
//!
//! - [`Definition`] / [`DefinitionStore`] - persisted, versioned provider
//!   configuration records
//! - [`EventChannel`] / [`ExtensionEvent`] - tenant-scoped deploy, update
//!   and undeploy notifications
//! - [`ProviderBuilder`] / [`ProviderCatalog`] - statically registered
//!   mapping from a provider type identifier to a constructor
//! - [`ProviderLifecycle`] / [`BuiltProvider`] - the explicit capability a
//!   builder declares when its providers hold resources that must be
//!   started and stopped
//! - [`ReadinessSink`] - the observational surface for per-tenant,
//!   per-extension load status

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod definition;
pub mod error;
pub mod event;
pub mod extension;
pub mod factory;
pub mod provider;
pub mod readiness;

pub use definition::{Definition, DefinitionStore, DefinitionStream};
pub use error::{SpiError, SpiResult};
pub use event::{EventChannel, EventKind, EventSubscription, ExtensionEvent};
pub use extension::ExtensionPoint;
pub use factory::{ProviderBuilder, ProviderCatalog};
pub use provider::{BuiltProvider, ProviderLifecycle};
pub use readiness::{MemoryReadinessSink, ReadinessRecord, ReadinessSink};
