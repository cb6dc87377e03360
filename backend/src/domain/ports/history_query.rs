//! Driving port for per-subject read paths.

use async_trait::async_trait;

use crate::domain::{Error, ReadParams};

/// Reads a subject's stored visits and profile.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubjectHistoryQuery: Send + Sync {
    /// Item ids the subject visited, most recent first.
    async fn visit_history(&self, params: ReadParams) -> Result<Vec<String>, Error>;

    /// Raw stored events of the subject, most recent first.
    async fn profile(&self, params: ReadParams) -> Result<Vec<String>, Error>;
}
