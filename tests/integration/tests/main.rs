//! End-to-end tests for tenant activation, hot reload, and isolation.
//!
//! Everything runs against the in-memory definition store and event
//! channel; the store's administrative `put`/`remove` surface stands in
//! for the control plane.

mod common;

mod bootstrap;
mod hot_reload;
mod tenant_isolation;
