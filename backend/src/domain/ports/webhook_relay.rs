//! Port for best-effort notifications to third-party endpoints.

use async_trait::async_trait;
use url::Url;

use super::define_port_error;
use crate::domain::Event;

define_port_error! {
    /// Errors raised by relay adapters.
    pub enum RelayError {
        /// The endpoint answered with a status outside 200, 201 and 204.
        Status { url: String, status: u16 } => "Fetch failed {url} Incorrect response code {status}",
        /// The call never produced a response.
        Transport { url: String, message: String } => "Fetch failed {url} {message}",
    }
}

/// Status of an accepted relay call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayAck {
    /// HTTP status returned by the endpoint.
    pub status: u16,
}

/// Outbound relay of tracked events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookRelay: Send + Sync {
    /// Notify `url` about `event`.
    async fn notify(&self, url: &Url, event: &Event) -> Result<RelayAck, RelayError>;
}
