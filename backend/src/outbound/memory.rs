//! In-process list store for local runs and end-to-end tests.
//!
//! Mirrors the Redis list semantics the service relies on (head insertion,
//! full-range reads, per-key expiry) and carries a connection switch so
//! callers can exercise the disconnected path without a server.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::StoreKey;
use crate::domain::ports::{
    DiagnosticsError, EventStore, StoreDiagnostics, StoreError, StoreInfo,
};

#[derive(Debug, Default)]
struct Entry {
    values: VecDeque<String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Thread-safe in-memory [`EventStore`].
#[derive(Debug)]
pub struct MemoryEventStore {
    lists: Mutex<HashMap<String, Entry>>,
    connected: AtomicBool,
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self {
            lists: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }
}

impl MemoryEventStore {
    /// Empty, connected store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost connection; every call fails until [`Self::reconnect`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Restore the simulated connection.
    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Remaining lifetime of `key`, if it has one.
    pub fn ttl(&self, key: &StoreKey) -> Option<Duration> {
        let lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        let expires_at = lists.get(key.as_str())?.expires_at?;
        Some(expires_at.saturating_duration_since(Instant::now()))
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::connection_lost("The connection is already closed."))
        }
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(
        &self,
        key: &StoreKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<u64, StoreError> {
        self.ensure_connected()?;
        let now = Instant::now();
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = lists.entry(key.as_str().to_owned()).or_default();
        if entry.is_expired(now) {
            *entry = Entry::default();
        }
        entry.values.push_front(value.to_owned());
        if let Some(ttl) = ttl {
            entry.expires_at = Some(now + ttl);
        }
        Ok(entry.values.len() as u64)
    }

    async fn range(&self, key: &StoreKey) -> Result<Vec<String>, StoreError> {
        self.ensure_connected()?;
        let now = Instant::now();
        let lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(lists
            .get(key.as_str())
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.values.iter().cloned().collect())
            .unwrap_or_default())
    }
}

/// Diagnostics for the in-memory backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryDiagnostics;

#[async_trait]
impl StoreDiagnostics for MemoryDiagnostics {
    async fn server_info(&self) -> Result<StoreInfo, DiagnosticsError> {
        Ok(StoreInfo(BTreeMap::from([
            ("backend".to_owned(), "memory".to_owned()),
            (
                "version".to_owned(),
                env!("CARGO_PKG_VERSION").to_owned(),
            ),
        ])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Namespace;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> MemoryEventStore {
        MemoryEventStore::new()
    }

    #[rstest]
    #[tokio::test]
    async fn append_inserts_at_head(store: MemoryEventStore) {
        let key = StoreKey::subject(Namespace::Visits, "12345");
        assert_eq!(store.append(&key, "first", None).await.expect("append"), 1);
        assert_eq!(store.append(&key, "second", None).await.expect("append"), 2);

        let entries = store.range(&key).await.expect("range");
        assert_eq!(entries, vec!["second", "first"]);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_key_reads_empty(store: MemoryEventStore) {
        let key = StoreKey::subject(Namespace::Users, "nobody");
        assert!(store.range(&key).await.expect("range").is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn ttl_is_recorded_and_expired_keys_vanish(store: MemoryEventStore) {
        let key = StoreKey::subject(Namespace::Users, "12345");
        store
            .append(&key, "v", Some(Duration::from_secs(60)))
            .await
            .expect("append");
        assert!(store.ttl(&key).is_some_and(|ttl| ttl > Duration::from_secs(50)));
        assert_eq!(store.ttl(&StoreKey::global(Namespace::Tracks)), None);

        store
            .append(&key, "v", Some(Duration::ZERO))
            .await
            .expect("append");
        assert!(store.range(&key).await.expect("range").is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn disconnected_store_rejects_calls(store: MemoryEventStore) {
        let key = StoreKey::global(Namespace::Tracks);
        store.disconnect();
        let err = store.append(&key, "v", None).await.expect_err("rejected");
        assert!(matches!(err, StoreError::ConnectionLost { .. }));
        assert!(store.range(&key).await.is_err());

        store.reconnect();
        assert_eq!(store.append(&key, "v", None).await.expect("append"), 1);
    }

    #[tokio::test]
    async fn diagnostics_report_backend() {
        let info = MemoryDiagnostics.server_info().await.expect("info");
        assert_eq!(info.get("backend"), Some("memory"));
    }
}
