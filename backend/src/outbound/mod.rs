//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **redis**: list store and diagnostics on a supervised Redis connection
//! - **memory**: in-process store for local runs and end-to-end tests
//! - **webhook**: reqwest relay to third-party tracking endpoints
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod memory;
pub mod redis;
pub mod webhook;
