//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`EventStore`, `StoreDiagnostics`, `WebhookRelay`) are
//! implemented by outbound adapters. Driving ports (`TrackCommand`,
//! `SubjectHistoryQuery`, `HealthQuery`) are implemented by
//! [`crate::domain::TrackingService`] and consumed by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod event_store;
mod health_query;
mod history_query;
mod store_diagnostics;
mod track_command;
mod webhook_relay;

#[cfg(test)]
pub use event_store::MockEventStore;
pub use event_store::{EventStore, StoreError};
#[cfg(test)]
pub use health_query::MockHealthQuery;
pub use health_query::HealthQuery;
#[cfg(test)]
pub use history_query::MockSubjectHistoryQuery;
pub use history_query::SubjectHistoryQuery;
#[cfg(test)]
pub use store_diagnostics::MockStoreDiagnostics;
pub use store_diagnostics::{DiagnosticsError, StoreDiagnostics, StoreInfo};
#[cfg(test)]
pub use track_command::MockTrackCommand;
pub use track_command::{TrackCommand, TrackReceipt};
#[cfg(test)]
pub use webhook_relay::MockWebhookRelay;
pub use webhook_relay::{RelayAck, RelayError, WebhookRelay};
