//! Domain primitives, validation rules and the tracking service.
//!
//! Purpose: keep request rules, event normalisation and the reconnection
//! policy free of transport and storage concerns. Adapters in
//! [`crate::inbound`] and [`crate::outbound`] talk to this layer through the
//! traits in [`ports`].

pub mod error;
pub mod event;
pub mod ports;
pub mod reconnect;
pub mod store_key;
pub mod tracking_service;
pub mod validation;

pub use self::error::{ConfigurationError, Error, ErrorCode};
pub use self::event::{ACTION_OBJECT_VISITED, Event, RequestMetadata, TrackPayload, build_event};
pub use self::reconnect::{
    CONNECTION_REFUSED, ConnectionAttempt, ConnectionState, ConnectionTracker, ReconnectDecision,
    ReconnectError, ReconnectPolicy,
};
pub use self::store_key::{Namespace, StoreKey};
pub use self::tracking_service::{StoreWrite, TrackingService, TrackingSettings, plan_writes};
pub use self::validation::{ReadParams, SubjectId, validate_read_request, validate_write_request};
