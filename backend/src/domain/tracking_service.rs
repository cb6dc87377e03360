//! Tracking domain service.
//!
//! Implements the driving ports on top of the store, diagnostics and relay
//! ports. Writes for one event run concurrently; the call succeeds only when
//! every write succeeds. Writes that landed before a failure are not undone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{join, join_all};
use mockable::Clock;
use serde_json::{Value, json};
use tracing::{debug, error, info};
use url::Url;

use crate::domain::ports::{
    EventStore, HealthQuery, RelayAck, RelayError, StoreDiagnostics, StoreError, StoreInfo,
    SubjectHistoryQuery, TrackCommand, TrackReceipt, WebhookRelay,
};
use crate::domain::{
    ConfigurationError, Error, Event, Namespace, ReadParams, RequestMetadata, StoreKey,
    build_event, validate_read_request, validate_write_request,
};

/// Settings the service needs beyond its ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingSettings {
    /// Expiry applied to per-subject keys.
    pub ttl: Duration,
    /// Third-party endpoints notified on `objectVisited`.
    pub relay_endpoints: Vec<Url>,
}

/// One append issued for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    /// Target list.
    pub key: StoreKey,
    /// Value pushed onto the list.
    pub value: String,
    /// Expiry set after the push, if any.
    pub ttl: Option<Duration>,
}

/// Writes required to persist `event`.
///
/// Every event goes to the global track log (no expiry) and to the subject's
/// profile. Visits additionally push the item id onto the subject's visit
/// list.
pub fn plan_writes(event: &Event, serialized: &str, ttl: Duration) -> Vec<StoreWrite> {
    let mut writes = vec![
        StoreWrite {
            key: StoreKey::global(Namespace::Tracks),
            value: serialized.to_owned(),
            ttl: None,
        },
        StoreWrite {
            key: StoreKey::subject(Namespace::Users, event.subject_id()),
            value: serialized.to_owned(),
            ttl: Some(ttl),
        },
    ];
    if event.is_visit() {
        writes.push(StoreWrite {
            key: StoreKey::subject(Namespace::Visits, event.subject_id()),
            value: event.item_id().to_owned(),
            ttl: Some(ttl),
        });
    }
    writes
}

fn map_store_error(error: &StoreError) -> Error {
    Error::store_failure(error.to_string())
}

/// Orchestrates validation, normalisation, persistence and relay.
#[derive(Clone)]
pub struct TrackingService {
    store: Arc<dyn EventStore>,
    diagnostics: Arc<dyn StoreDiagnostics>,
    relay: Arc<dyn WebhookRelay>,
    clock: Arc<dyn Clock>,
    settings: TrackingSettings,
}

impl TrackingService {
    /// Build the service from connected ports.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] when the TTL is zero.
    pub fn new(
        store: Arc<dyn EventStore>,
        diagnostics: Arc<dyn StoreDiagnostics>,
        relay: Arc<dyn WebhookRelay>,
        clock: Arc<dyn Clock>,
        settings: TrackingSettings,
    ) -> Result<Self, ConfigurationError> {
        if settings.ttl.is_zero() {
            return Err(ConfigurationError::invalid(
                "redis_ttl_seconds",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            store,
            diagnostics,
            relay,
            clock,
            settings,
        })
    }

    async fn relay_event(&self, event: &Event) -> Vec<Result<RelayAck, RelayError>> {
        if !event.is_visit() {
            return Vec::new();
        }
        let outcomes = join_all(
            self.settings
                .relay_endpoints
                .iter()
                .map(|url| self.relay.notify(url, event)),
        )
        .await;
        for outcome in &outcomes {
            match outcome {
                Ok(ack) => debug!(status = ack.status, "relay accepted event"),
                Err(err) => error!(error = %err, "relay failed"),
            }
        }
        outcomes
    }

    async fn read_list(&self, key: StoreKey) -> Result<Vec<String>, Error> {
        let entries = self.store.range(&key).await.map_err(|err| {
            error!(key = %key, error = %err, "failed loading data");
            map_store_error(&err)
        })?;
        debug!(key = %key, entries = entries.len(), "data loaded");
        Ok(entries)
    }
}

fn write_report(writes: &[StoreWrite], outcomes: &[Result<u64, StoreError>]) -> Value {
    let entries: Vec<Value> = writes
        .iter()
        .zip(outcomes)
        .map(|(write, outcome)| match outcome {
            Ok(_) => json!({ "key": write.key.as_str(), "stored": true }),
            Err(err) => json!({
                "key": write.key.as_str(),
                "stored": false,
                "error": err.to_string(),
            }),
        })
        .collect();
    json!({ "writes": entries })
}

#[async_trait]
impl TrackCommand for TrackingService {
    async fn record_event(
        &self,
        body: Vec<u8>,
        metadata: RequestMetadata,
    ) -> Result<TrackReceipt, Error> {
        let payload = validate_write_request(&body)?;
        let event = build_event(&payload, &metadata, self.clock.utc());
        let serialized = event
            .to_json()
            .map_err(|err| Error::internal(format!("event serialisation failed: {err}")))?;
        let writes = plan_writes(&event, &serialized, self.settings.ttl);

        let appends = join_all(
            writes
                .iter()
                .map(|write| self.store.append(&write.key, &write.value, write.ttl)),
        );
        let (outcomes, relays) = join(appends, self.relay_event(&event)).await;

        if let Some(failure) = outcomes.iter().find_map(|outcome| outcome.as_ref().err()) {
            error!(
                subject_id = event.subject_id(),
                error = %failure,
                "failed storing event"
            );
            return Err(map_store_error(failure).with_details(write_report(&writes, &outcomes)));
        }

        let relay_failures = relays.iter().filter(|outcome| outcome.is_err()).count();
        info!(
            subject_id = event.subject_id(),
            action = event.action(),
            writes = writes.len(),
            "data stored"
        );
        Ok(TrackReceipt {
            writes: writes.len(),
            relays: relays.len(),
            relay_failures,
        })
    }
}

#[async_trait]
impl SubjectHistoryQuery for TrackingService {
    async fn visit_history(&self, params: ReadParams) -> Result<Vec<String>, Error> {
        let subject = validate_read_request(Some(&params))?;
        self.read_list(StoreKey::subject(Namespace::Visits, subject.as_str()))
            .await
    }

    async fn profile(&self, params: ReadParams) -> Result<Vec<String>, Error> {
        let subject = validate_read_request(Some(&params))?;
        self.read_list(StoreKey::subject(Namespace::Users, subject.as_str()))
            .await
    }
}

#[async_trait]
impl HealthQuery for TrackingService {
    fn health_check(&self) {
        debug!("health check handled");
    }

    async fn store_diagnostics(&self) -> Result<StoreInfo, Error> {
        self.diagnostics.server_info().await.map_err(|err| {
            error!(error = %err, "store diagnostics failed");
            Error::store_failure(format!("Redis connection failure - {err}"))
        })
    }
}

#[cfg(test)]
#[path = "tracking_service_tests.rs"]
mod tests;
