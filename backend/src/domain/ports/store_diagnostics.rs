//! Port for out-of-band store diagnostics.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;

define_port_error! {
    /// Errors raised while collecting diagnostics.
    pub enum DiagnosticsError {
        /// The diagnostic connection could not be opened.
        Connection { message: String } => "{message}",
        /// The server rejected the metadata request.
        Query { message: String } => "server info query failed: {message}",
    }
}

/// Server metadata reported by the store, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StoreInfo(pub BTreeMap<String, String>);

impl StoreInfo {
    /// Look up a single field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

/// Reports store metadata over a connection separate from serving traffic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreDiagnostics: Send + Sync {
    /// Open a short-lived connection, fetch server metadata, close it.
    async fn server_info(&self) -> Result<StoreInfo, DiagnosticsError>;
}
