//! # ag-core
//!
//! Core types shared across the Authgate identity gateway.
//!
//! This crate holds the pieces every other crate needs: tenant references,
//! the gateway configuration, and the bounded retry policy used during
//! bootstrap.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod tenant;

pub use config::{GatewayConfig, RetryPolicy};
pub use tenant::{TenantKind, TenantRef};
