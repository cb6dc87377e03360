//! Reconnection policy and connection state machine for the backing store.
//!
//! [`ReconnectPolicy::decide`] is a pure function consulted after every
//! failed connection attempt. [`ConnectionTracker`] wraps it with the state a
//! store driver keeps between attempts:
//!
//! ```text
//! Disconnected --attempt--> Connecting --success--> Connected
//!                            |  ^  |                   |
//!                   retry    +--+  +--refused/timeout--+--> TerminallyFailed
//!                                  +--both limits cleared--> GaveUp
//! Connected --connection lost--> Disconnected
//! ```
//!
//! `GaveUp` raises no error. Dependents observe it through
//! [`ConnectionTracker::state`] instead.

use std::time::{Duration, Instant};

/// Error code reported when the server actively refuses the connection.
pub const CONNECTION_REFUSED: &str = "ECONNREFUSED";

/// Observable lifecycle of the store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in progress.
    Disconnected,
    /// An attempt (or the wait before the next one) is in progress.
    Connecting,
    /// Connected and serving commands.
    Connected,
    /// Reconnection aborted with an error; the store is unusable.
    TerminallyFailed,
    /// Reconnection stopped silently; the store is unusable.
    GaveUp,
}

impl ConnectionState {
    /// Whether store commands may be issued.
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Transient record of the current reconnect sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionAttempt {
    /// Failed attempts so far in this sequence (0-based).
    pub attempt: u32,
    /// Time elapsed since the first failure of this sequence.
    pub total_retry_time: Duration,
    /// Successful connections over the client's lifetime.
    pub times_connected: u32,
    /// Code of the most recent failure.
    pub error_code: String,
}

/// Terminal reconnect failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconnectError {
    /// The server refused the connection.
    #[error("the server refused the connection")]
    Refused,
    /// Total retry time exceeded the configured connection timeout.
    #[error("retry time {timeout_ms}ms reached, aborting")]
    RetryTimeExceeded { timeout_ms: u128 },
}

/// Outcome of consulting the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait this long, then attempt again.
    RetryAfter(Duration),
    /// Stop and surface the error.
    Abort(ReconnectError),
    /// Stop without surfacing an error.
    GiveUp,
}

/// Reconnect thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Upper bound on total retry time.
    pub connection_timeout: Duration,
    /// Attempt and connection count both must exceed this to give up.
    pub maximum_attempts: u32,
    /// Delay between attempts.
    pub attempts_interval: Duration,
}

impl ReconnectPolicy {
    /// Decide what to do after a failed attempt.
    ///
    /// Rules, first match wins:
    /// 1. `ECONNREFUSED` aborts.
    /// 2. Total retry time above the connection timeout aborts.
    /// 3. Attempts and lifetime connections both above the maximum gives up.
    /// 4. Otherwise retry after the configured interval.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use tracker::domain::{ConnectionAttempt, ReconnectDecision, ReconnectPolicy};
    ///
    /// let policy = ReconnectPolicy {
    ///     connection_timeout: Duration::from_millis(1000),
    ///     maximum_attempts: 10,
    ///     attempts_interval: Duration::from_millis(400),
    /// };
    /// let attempt = ConnectionAttempt {
    ///     attempt: 1,
    ///     total_retry_time: Duration::from_millis(10),
    ///     times_connected: 0,
    ///     error_code: "ECONNRESET".to_owned(),
    /// };
    /// assert_eq!(
    ///     policy.decide(&attempt),
    ///     ReconnectDecision::RetryAfter(Duration::from_millis(400))
    /// );
    /// ```
    pub fn decide(&self, attempt: &ConnectionAttempt) -> ReconnectDecision {
        if attempt.error_code == CONNECTION_REFUSED {
            return ReconnectDecision::Abort(ReconnectError::Refused);
        }
        if attempt.total_retry_time > self.connection_timeout {
            return ReconnectDecision::Abort(ReconnectError::RetryTimeExceeded {
                timeout_ms: self.connection_timeout.as_millis(),
            });
        }
        if attempt.attempt > self.maximum_attempts
            && attempt.times_connected > self.maximum_attempts
        {
            return ReconnectDecision::GiveUp;
        }
        ReconnectDecision::RetryAfter(self.attempts_interval)
    }
}

/// Connection state machine driven by a store adapter.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempt: u32,
    first_failure_at: Option<Instant>,
    times_connected: u32,
    last_error_code: Option<String>,
}

impl ConnectionTracker {
    /// Start in [`ConnectionState::Disconnected`].
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempt: 0,
            first_failure_at: None,
            times_connected: 0,
            last_error_code: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Successful connections over the tracker's lifetime.
    pub fn times_connected(&self) -> u32 {
        self.times_connected
    }

    /// Code of the most recent failure in the current sequence.
    pub fn last_error_code(&self) -> Option<&str> {
        self.last_error_code.as_deref()
    }

    /// Mark an attempt as started.
    ///
    /// Terminal states are sticky; returns `false` when no attempt may start.
    pub fn begin_attempt(&mut self) -> bool {
        match self.state {
            ConnectionState::TerminallyFailed | ConnectionState::GaveUp => false,
            _ => {
                self.state = ConnectionState::Connecting;
                true
            }
        }
    }

    /// Record a successful connection and reset the retry sequence.
    pub fn record_success(&mut self) {
        self.state = ConnectionState::Connected;
        self.times_connected = self.times_connected.saturating_add(1);
        self.attempt = 0;
        self.first_failure_at = None;
        self.last_error_code = None;
    }

    /// Record a failed attempt at `now` and apply the policy's decision.
    pub fn record_failure(&mut self, error_code: &str, now: Instant) -> ReconnectDecision {
        let first_failure_at = *self.first_failure_at.get_or_insert(now);
        let snapshot = ConnectionAttempt {
            attempt: self.attempt,
            total_retry_time: now.saturating_duration_since(first_failure_at),
            times_connected: self.times_connected,
            error_code: error_code.to_owned(),
        };
        self.attempt = self.attempt.saturating_add(1);
        self.last_error_code = Some(snapshot.error_code.clone());

        let decision = self.policy.decide(&snapshot);
        self.state = match decision {
            ReconnectDecision::RetryAfter(_) => ConnectionState::Connecting,
            ReconnectDecision::Abort(_) => ConnectionState::TerminallyFailed,
            ReconnectDecision::GiveUp => ConnectionState::GaveUp,
        };
        decision
    }

    /// Record that an established connection dropped.
    pub fn record_lost(&mut self) {
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Disconnected;
        }
    }
}
