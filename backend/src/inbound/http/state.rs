//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{HealthQuery, SubjectHistoryQuery, TrackCommand};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub tracks: Arc<dyn TrackCommand>,
    pub history: Arc<dyn SubjectHistoryQuery>,
    pub health: Arc<dyn HealthQuery>,
}

impl HttpState {
    /// Construct state from explicit port implementations.
    ///
    /// # Examples
    /// ```ignore
    /// let state = HttpState::new(tracks, history, health);
    /// ```
    pub fn new(
        tracks: Arc<dyn TrackCommand>,
        history: Arc<dyn SubjectHistoryQuery>,
        health: Arc<dyn HealthQuery>,
    ) -> Self {
        Self {
            tracks,
            history,
            health,
        }
    }

    /// State whose every port is served by one implementation.
    pub fn from_service<S>(service: Arc<S>) -> Self
    where
        S: TrackCommand + SubjectHistoryQuery + HealthQuery + 'static,
    {
        Self {
            tracks: service.clone(),
            history: service.clone(),
            health: service,
        }
    }
}
