//! Redis-backed adapters for the store and diagnostics ports.
//!
//! Lists hold the stored values: `LPUSH` adds to the head, `EXPIRE` sets the
//! key lifetime and `LRANGE 0 -1` reads everything back, newest first.

mod connection;
mod diagnostics;
#[cfg(test)]
mod fake_server;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use tokio::sync::watch;
use tracing::debug;

use crate::domain::ports::{EventStore, StoreError};
use crate::domain::{ConfigurationError, ConnectionState, ReconnectPolicy, StoreKey};

use self::connection::ConnectionHandle;
pub use self::connection::{CONNECTION_TIMED_OUT, RedisConnection};
pub use self::diagnostics::{RedisDiagnostics, parse_info};

/// Where and how to reach Redis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Reconnect thresholds; `connection_timeout` also bounds each attempt.
    pub policy: ReconnectPolicy,
}

impl RedisConfig {
    /// Connection URL for the configured server.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    /// Open a client handle without connecting.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] when the host and port do not form a
    /// valid Redis URL.
    pub fn client(&self) -> Result<Client, ConfigurationError> {
        Client::open(self.url())
            .map_err(|err| ConfigurationError::invalid("redis_host", err.to_string()))
    }
}

/// Event store on a supervised Redis connection.
#[derive(Clone)]
pub struct RedisEventStore {
    connection: Arc<RedisConnection>,
}

impl RedisEventStore {
    /// Connect using `config`; fails when the first connection cannot be
    /// established.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the reconnect policy stops before a
    /// connection succeeds or the URL is invalid.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = config
            .client()
            .map_err(|err| StoreError::protocol(err.to_string()))?;
        let connection = RedisConnection::connect(client, config.policy).await?;
        Ok(Self { connection })
    }

    /// Observe connection state, including a silent give-up.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl EventStore for RedisEventStore {
    async fn append(
        &self,
        key: &StoreKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<u64, StoreError> {
        let ConnectionHandle {
            generation,
            mut connection,
        } = self.connection.handle()?;
        let length: u64 = connection
            .lpush(key.as_str(), value)
            .await
            .map_err(|err| self.connection.observe_error(generation, &err))?;
        debug!(key = %key, length, "LPUSH reply");

        if let Some(ttl) = ttl {
            let applied: bool = connection
                .expire(key.as_str(), ttl_seconds(ttl))
                .await
                .map_err(|err| self.connection.observe_error(generation, &err))?;
            debug!(key = %key, applied, "EXPIRE reply");
        }
        Ok(length)
    }

    async fn range(&self, key: &StoreKey) -> Result<Vec<String>, StoreError> {
        let ConnectionHandle {
            generation,
            mut connection,
        } = self.connection.handle()?;
        let entries: Vec<String> = connection
            .lrange(key.as_str(), 0, -1)
            .await
            .map_err(|err| self.connection.observe_error(generation, &err))?;
        debug!(key = %key, entries = entries.len(), "LRANGE reply");
        Ok(entries)
    }
}
