//! Canonical tracked event and the normaliser that builds it.
//!
//! An [`Event`] is built once per accepted write request, serialised, handed
//! to the store and dropped. Its timestamp always comes from the service
//! clock, never from the caller.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Action whose events are also recorded in the subject's visit list.
pub const ACTION_OBJECT_VISITED: &str = "objectVisited";

/// Validated write request body.
///
/// Only [`crate::domain::validate_write_request`] constructs this type, so
/// holding one proves the subject, action and item id passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPayload {
    pub(crate) subject_id: String,
    pub(crate) action: String,
    pub(crate) item_id: String,
    pub(crate) data: Map<String, Value>,
    pub(crate) site: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) referrer: Option<String>,
}

impl TrackPayload {
    /// Subject that produced the event.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Event kind.
    pub fn action(&self) -> &str {
        &self.action
    }
}

/// Transport metadata captured alongside the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Value of the inbound `Referrer`/`Referer` header, if any.
    pub referer_header: Option<String>,
}

/// Canonical, immutable record of a single tracked action.
///
/// Serialises to the stored JSON shape:
/// `{"uid","itemId","timestamp","action","site","url","referrer","customData"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "uid")]
    subject_id: String,
    item_id: String,
    timestamp: String,
    action: String,
    site: Option<String>,
    url: Option<String>,
    referrer: Option<String>,
    custom_data: Map<String, Value>,
}

impl Event {
    /// Subject that produced the event.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Object acted upon.
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// ISO-8601 receipt time assigned by the service.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Event kind.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Originating site, if supplied.
    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    /// Decoded page URL, if supplied.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Explicit referrer or the request's referrer header.
    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    /// Arbitrary caller payload (the request's `data` object).
    pub fn custom_data(&self) -> &Map<String, Value> {
        &self.custom_data
    }

    /// Whether the event also belongs in the visit list.
    pub fn is_visit(&self) -> bool {
        self.action == ACTION_OBJECT_VISITED
    }

    /// Serialise to the stored JSON form.
    ///
    /// # Errors
    /// Returns the serde error; unreachable for the value types held here.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Build the canonical event for `payload` received at `received_at`.
///
/// Identical inputs produce identical events; only `received_at` varies the
/// timestamp. The URL is percent-decoded once and never re-encoded.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use tracker::domain::{RequestMetadata, build_event, validate_write_request};
///
/// let payload = validate_write_request(
///     br#"{"uid":"12345","action":"fakeAction","data":{"id":"item"},"url":"a%2Fb"}"#,
/// )
/// .expect("valid payload");
/// let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().expect("valid time");
/// let event = build_event(&payload, &RequestMetadata::default(), at);
/// assert_eq!(event.url(), Some("a/b"));
/// assert_eq!(event.timestamp(), "2026-01-02T03:04:05.000Z");
/// ```
pub fn build_event(
    payload: &TrackPayload,
    metadata: &RequestMetadata,
    received_at: DateTime<Utc>,
) -> Event {
    Event {
        subject_id: payload.subject_id.clone(),
        item_id: payload.item_id.clone(),
        timestamp: received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        action: payload.action.clone(),
        site: payload.site.clone(),
        url: payload.url.as_deref().map(decode_url),
        referrer: payload
            .referrer
            .clone()
            .or_else(|| metadata.referer_header.clone()),
        custom_data: payload.data.clone(),
    }
}

fn decode_url(raw: &str) -> String {
    // Invalid UTF-8 sequences are replaced rather than rejecting the event.
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}
