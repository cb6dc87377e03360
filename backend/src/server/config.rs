//! HTTP server configuration object.

use tracker::inbound::http::state::HttpState;

/// Everything needed to start the HTTP server.
pub struct ServerConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) http_state: HttpState,
}

impl ServerConfig {
    /// Construct a server configuration binding `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, http_state: HttpState) -> Self {
        Self {
            host: host.into(),
            port,
            http_state,
        }
    }
}
