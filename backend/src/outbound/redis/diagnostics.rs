//! Server metadata over a dedicated, short-lived connection.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::Client;
use tracing::debug;

use crate::domain::ports::{DiagnosticsError, StoreDiagnostics, StoreInfo};

/// `INFO`-based diagnostics that never touch the serving connection.
#[derive(Clone)]
pub struct RedisDiagnostics {
    client: Client,
    connect_timeout: Duration,
}

impl RedisDiagnostics {
    /// Diagnostics for `client`, bounding the connect by `connect_timeout`.
    pub fn new(client: Client, connect_timeout: Duration) -> Self {
        Self {
            client,
            connect_timeout,
        }
    }
}

/// Parse an `INFO` reply into field/value pairs.
///
/// Section headers (`# Server`) and blank lines are skipped; lines without a
/// colon are ignored.
///
/// # Examples
/// ```
/// use tracker::outbound::redis::parse_info;
///
/// let info = parse_info("# Server\r\nredis_version:7.2.4\r\n\r\nuptime_in_days:3\r\n");
/// assert_eq!(info.get("redis_version"), Some("7.2.4"));
/// assert_eq!(info.0.len(), 2);
/// ```
pub fn parse_info(raw: &str) -> StoreInfo {
    let fields: BTreeMap<String, String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(field, value)| (field.to_owned(), value.to_owned()))
        .collect();
    StoreInfo(fields)
}

#[async_trait]
impl StoreDiagnostics for RedisDiagnostics {
    async fn server_info(&self) -> Result<StoreInfo, DiagnosticsError> {
        let mut conn = tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| DiagnosticsError::connection("connection timed out"))?
        .map_err(|err| DiagnosticsError::connection(err.to_string()))?;

        let raw: String = redis::cmd("INFO")
            .query_async(&mut conn)
            .await
            .map_err(|err| DiagnosticsError::query(err.to_string()))?;
        let info = parse_info(&raw);
        debug!(fields = info.0.len(), "INFO reply");
        Ok(info)
    }
}
