//! Event tracking backend: validates behavioural "track" events, persists them
//! into an expiring keyed list store and relays selected events to third
//! parties.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

pub use middleware::{Trace, TraceId};
