//! Supervised Redis connection.
//!
//! One multiplexed connection is shared by every store command. Failed
//! connects are fed to [`ConnectionTracker`], which applies the reconnect
//! policy. After a connection drops, a background task reconnects with
//! asynchronous delays while commands fail fast with
//! [`StoreError::ConnectionLost`]. Handles carry the generation of the
//! connection they were cloned from, so late errors from a replaced
//! connection never tear down its successor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, warn};

use crate::domain::ports::StoreError;
use crate::domain::{
    CONNECTION_REFUSED, ConnectionState, ConnectionTracker, ReconnectDecision, ReconnectPolicy,
};

/// Error code recorded when a connect attempt exceeds the connection timeout.
pub const CONNECTION_TIMED_OUT: &str = "ETIMEDOUT";
const CONNECTION_RESET: &str = "ECONNRESET";

/// Map a connect failure to the error code the reconnect policy inspects.
pub(crate) fn error_code(err: &RedisError) -> String {
    if err.is_connection_refusal() {
        CONNECTION_REFUSED.to_owned()
    } else if err.is_timeout() {
        CONNECTION_TIMED_OUT.to_owned()
    } else if err.is_connection_dropped() {
        CONNECTION_RESET.to_owned()
    } else {
        format!("{:?}", err.kind())
    }
}

/// Map a command failure onto the store port error.
pub(crate) fn map_command_error(err: &RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::timeout(err.to_string())
    } else if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        StoreError::connection_lost(err.to_string())
    } else {
        StoreError::protocol(err.to_string())
    }
}

fn is_connection_failure(err: &RedisError) -> bool {
    err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error()
}

/// A clone of the live connection tagged with its generation.
#[derive(Clone)]
pub(crate) struct ConnectionHandle {
    pub(crate) generation: u64,
    pub(crate) connection: MultiplexedConnection,
}

/// Shared, policy-driven connection to a Redis server.
pub struct RedisConnection {
    client: Client,
    connect_timeout: Duration,
    connection: RwLock<Option<ConnectionHandle>>,
    generations: AtomicU64,
    tracker: Mutex<ConnectionTracker>,
    state: watch::Sender<ConnectionState>,
    lost: Arc<Notify>,
}

impl RedisConnection {
    /// Connect to `client`, retrying per `policy`.
    ///
    /// Returns once a connection is established and starts the background
    /// reconnect task.
    ///
    /// # Errors
    /// Returns [`StoreError::ConnectionLost`] when the policy aborts or gives
    /// up before any connection succeeds.
    pub async fn connect(
        client: Client,
        policy: ReconnectPolicy,
    ) -> Result<Arc<Self>, StoreError> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let connection = Arc::new(Self {
            client,
            connect_timeout: policy.connection_timeout,
            connection: RwLock::new(None),
            generations: AtomicU64::new(0),
            tracker: Mutex::new(ConnectionTracker::new(policy)),
            state,
            lost: Arc::new(Notify::new()),
        });
        connection.establish().await?;
        tokio::spawn(supervise(Arc::downgrade(&connection), Arc::clone(&connection.lost)));
        Ok(connection)
    }

    /// Subscribe to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Clone the live connection or fail fast when none is usable.
    pub(crate) fn handle(&self) -> Result<ConnectionHandle, StoreError> {
        let guard = self.connection.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone().ok_or_else(|| {
            StoreError::connection_lost(format!("store not connected ({:?})", self.state()))
        })
    }

    /// Inspect a command error from a handle of `generation`; connection
    /// failures on the current generation trigger reconnection.
    pub(crate) fn observe_error(&self, generation: u64, err: &RedisError) -> StoreError {
        if is_connection_failure(err) {
            self.mark_lost(generation);
        }
        map_command_error(err)
    }

    fn mark_lost(&self, generation: u64) {
        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        if tracker.state() != ConnectionState::Connected {
            return;
        }
        let mut slot = self.connection.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|handle| handle.generation) != Some(generation) {
            debug!(generation, "ignoring error from a replaced connection");
            return;
        }
        slot.take();
        drop(slot);
        tracker.record_lost();
        self.publish(tracker.state());
        warn!("store connection lost");
        self.lost.notify_one();
    }

    fn publish(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    async fn establish(&self) -> Result<(), StoreError> {
        loop {
            let started = {
                let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
                let started = tracker.begin_attempt();
                self.publish(tracker.state());
                started
            };
            if !started {
                return Err(StoreError::connection_lost("reconnection stopped"));
            }

            let code = match self.attempt().await {
                Ok(connection) => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
                    *self.connection.write().unwrap_or_else(PoisonError::into_inner) =
                        Some(ConnectionHandle {
                            generation,
                            connection,
                        });
                    let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
                    tracker.record_success();
                    self.publish(tracker.state());
                    info!(
                        generation,
                        times_connected = tracker.times_connected(),
                        "store connection established"
                    );
                    return Ok(());
                }
                Err(code) => code,
            };

            let decision = {
                let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
                let decision = tracker.record_failure(&code, Instant::now());
                self.publish(tracker.state());
                decision
            };
            match decision {
                ReconnectDecision::RetryAfter(delay) => {
                    warn!(
                        error_code = %code,
                        delay_ms = delay.as_millis(),
                        "store connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                ReconnectDecision::Abort(reason) => {
                    error!(error_code = %code, %reason, "store reconnection aborted");
                    return Err(StoreError::connection_lost(format!("{reason} ({code})")));
                }
                ReconnectDecision::GiveUp => {
                    warn!(error_code = %code, "store reconnection gave up");
                    return Err(StoreError::connection_lost(format!(
                        "gave up reconnecting ({code})"
                    )));
                }
            }
        }
    }

    async fn attempt(&self) -> Result<MultiplexedConnection, String> {
        match tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(err)) => Err(error_code(&err)),
            Err(_) => Err(CONNECTION_TIMED_OUT.to_owned()),
        }
    }
}

impl Drop for RedisConnection {
    fn drop(&mut self) {
        self.lost.notify_one();
    }
}

async fn supervise(connection: Weak<RedisConnection>, lost: Arc<Notify>) {
    loop {
        lost.notified().await;
        let Some(connection) = connection.upgrade() else {
            return;
        };
        if connection.state() != ConnectionState::Disconnected {
            continue;
        }
        if connection.establish().await.is_err() {
            // Terminal: the published state tells dependents why.
            return;
        }
    }
}
