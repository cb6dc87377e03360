//! Driving port for liveness and store diagnostics.

use async_trait::async_trait;

use super::StoreInfo;
use crate::domain::Error;

/// Service and store health checks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthQuery: Send + Sync {
    /// Succeeds whenever the process can answer; independent of the store.
    fn health_check(&self) {}

    /// Store metadata fetched over a dedicated diagnostic connection.
    async fn store_diagnostics(&self) -> Result<StoreInfo, Error>;
}
