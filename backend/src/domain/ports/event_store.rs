//! Port for the keyed list store holding events, profiles and visits.

use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::StoreKey;

define_port_error! {
    /// Errors surfaced by store adapters.
    pub enum StoreError {
        /// No usable connection; the operation was not attempted.
        ConnectionLost { message: String } => "store connection lost: {message}",
        /// The store did not answer in time.
        Timeout { message: String } => "store operation timed out: {message}",
        /// The store answered with an error or an unexpected reply.
        Protocol { message: String } => "store protocol error: {message}",
    }
}

/// Keyed list store with head insertion and key expiration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Push `value` onto the head of the list at `key`, then, when `ttl` is
    /// given, set the key to expire after it.
    ///
    /// The expiration is a second command issued after the push succeeds. If
    /// it fails the call fails even though the value already landed, and a
    /// crash between the two leaves a key without expiry.
    ///
    /// Returns the list length after the push.
    async fn append(
        &self,
        key: &StoreKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<u64, StoreError>;

    /// Read the whole list at `key`, most recently appended first.
    ///
    /// A missing key reads as an empty list.
    async fn range(&self, key: &StoreKey) -> Result<Vec<String>, StoreError>;
}
