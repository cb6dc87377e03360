//! Driving port for recording events.

use async_trait::async_trait;

use crate::domain::{Error, RequestMetadata};

/// Summary of an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackReceipt {
    /// Store writes issued and acknowledged.
    pub writes: usize,
    /// Relay calls issued.
    pub relays: usize,
    /// Relay calls that failed. Logged only; they never reject the event.
    pub relay_failures: usize,
}

/// Records tracked events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackCommand: Send + Sync {
    /// Validate, normalise and persist a raw track request body.
    async fn record_event(
        &self,
        body: Vec<u8>,
        metadata: RequestMetadata,
    ) -> Result<TrackReceipt, Error>;
}
