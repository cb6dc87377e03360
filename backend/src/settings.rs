//! Application settings loaded via OrthoConfig.
//!
//! Every option can come from CLI flags, `TRACKER_*` environment variables or
//! a config file. Unset options fall back to the defaults exposed by the
//! accessor methods; [`AppSettings::validate`] rejects unusable combinations
//! before anything connects.

use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{ConfigurationError, ReconnectPolicy, TrackingSettings};
use crate::outbound::redis::RedisConfig;
use crate::outbound::webhook::{ProxyConfig, RelayConfig, RelayMethod};

const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_SERVER_NAME: &str = "tracker";
const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_TTL_SECONDS: u64 = 1_209_600;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 1000;
const DEFAULT_MAXIMUM_ATTEMPTS: u32 = 10;
const DEFAULT_ATTEMPTS_INTERVAL_MS: u64 = 400;
const DEFAULT_RELAY_TIMEOUT_MS: u64 = 5000;

/// Which store adapter serves the event lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Redis lists on a supervised connection.
    Redis,
    /// In-process lists; data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigurationError::invalid(
                "store_backend",
                format!("unknown backend {other}"),
            )),
        }
    }
}

/// Configuration values for the tracking service.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TRACKER")]
pub struct AppSettings {
    /// Address the HTTP server binds to.
    pub server_host: Option<String>,
    /// Port the HTTP server binds to.
    pub server_port: Option<u16>,
    /// Name reported in startup logs.
    pub server_name: Option<String>,
    /// `redis` or `memory`.
    pub store_backend: Option<String>,
    pub redis_host: Option<String>,
    pub redis_port: Option<u16>,
    /// Lifetime of per-subject keys.
    pub redis_ttl_seconds: Option<u64>,
    /// Bound on each connect attempt and on the total retry time.
    pub redis_connection_timeout_ms: Option<u64>,
    pub redis_connection_maximum_attempts: Option<u32>,
    pub redis_connection_attempts_interval_ms: Option<u64>,
    /// Endpoints notified on `objectVisited`; comma-separated in the
    /// environment.
    pub relay_endpoints: Option<Vec<String>>,
    /// `GET` or `POST`.
    pub relay_method: Option<String>,
    pub relay_timeout_ms: Option<u64>,
    /// Route relay calls through the configured proxy.
    #[ortho_config(default = false)]
    pub proxy_enabled: bool,
    pub proxy_url: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    /// Skip installing the JSON log subscriber.
    #[ortho_config(default = false)]
    pub log_disabled: bool,
}

impl AppSettings {
    /// Return the bind host, falling back to all interfaces.
    pub fn server_host(&self) -> &str {
        self.server_host.as_deref().unwrap_or(DEFAULT_SERVER_HOST)
    }

    /// Return the bind port.
    pub fn server_port(&self) -> u16 {
        self.server_port.unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Return the service name.
    pub fn server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(DEFAULT_SERVER_NAME)
    }

    /// Whether logging is enabled; on unless `log_disabled` is set.
    pub fn log_enabled(&self) -> bool {
        !self.log_disabled
    }

    /// Parsed store backend; defaults to Redis.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] for unknown backend names.
    pub fn store_backend(&self) -> Result<StoreBackend, ConfigurationError> {
        self.store_backend
            .as_deref()
            .map_or(Ok(StoreBackend::Redis), str::parse)
    }

    /// Reconnect thresholds for the Redis connection.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            connection_timeout: Duration::from_millis(
                self.redis_connection_timeout_ms
                    .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_MS),
            ),
            maximum_attempts: self
                .redis_connection_maximum_attempts
                .unwrap_or(DEFAULT_MAXIMUM_ATTEMPTS),
            attempts_interval: Duration::from_millis(
                self.redis_connection_attempts_interval_ms
                    .unwrap_or(DEFAULT_ATTEMPTS_INTERVAL_MS),
            ),
        }
    }

    /// Redis adapter settings.
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            host: self
                .redis_host
                .clone()
                .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_owned()),
            port: self.redis_port.unwrap_or(DEFAULT_REDIS_PORT),
            policy: self.reconnect_policy(),
        }
    }

    /// Service settings: key TTL and relay endpoints.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] for a zero TTL or an unparsable
    /// endpoint URL.
    pub fn tracking_settings(&self) -> Result<TrackingSettings, ConfigurationError> {
        let ttl_seconds = self.redis_ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS);
        if ttl_seconds == 0 {
            return Err(ConfigurationError::invalid(
                "redis_ttl_seconds",
                "must be greater than zero",
            ));
        }
        let relay_endpoints = self
            .relay_endpoints
            .iter()
            .flatten()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                Url::parse(raw).map_err(|err| {
                    ConfigurationError::invalid("relay_endpoints", format!("{raw}: {err}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TrackingSettings {
            ttl: Duration::from_secs(ttl_seconds),
            relay_endpoints,
        })
    }

    /// Relay adapter settings, including the proxy when enabled.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] for an unknown method, or when the
    /// proxy is enabled without a valid URL.
    pub fn relay_config(&self) -> Result<RelayConfig, ConfigurationError> {
        let method = self
            .relay_method
            .as_deref()
            .map_or(Ok(RelayMethod::Get), str::parse)?;
        let proxy = if self.proxy_enabled {
            let raw = self
                .proxy_url
                .as_deref()
                .ok_or(ConfigurationError::Missing { name: "proxy_url" })?;
            let url = Url::parse(raw)
                .map_err(|err| ConfigurationError::invalid("proxy_url", err.to_string()))?;
            Some(ProxyConfig {
                url,
                username: self.proxy_username.clone(),
                password: self.proxy_password.clone(),
            })
        } else {
            None
        };
        Ok(RelayConfig {
            method,
            timeout: Duration::from_millis(self.relay_timeout_ms.unwrap_or(DEFAULT_RELAY_TIMEOUT_MS)),
            proxy,
        })
    }

    /// Check every derived setting at once.
    ///
    /// # Errors
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.store_backend()?;
        self.tracking_settings()?;
        self.relay_config()?;
        Ok(())
    }
}
