//! # ag-gateway
//!
//! Gateway assembly for Authgate.
//!
//! A [`TenantContext`] is the explicit, per-tenant value that owns one
//! provider registry per extension point; it is created when a tenant is
//! activated and dropped when the tenant is deactivated. There are no
//! process-wide singletons: everything a tenant's request path needs hangs
//! off its context.
//!
//! The [`memory`] module provides in-process implementations of the
//! definition store and event channel, used in development, tests, and
//! single-node deployments.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod context;
pub mod memory;

pub use context::TenantContext;
pub use memory::{MemoryDefinitionStore, MemoryEventChannel};
