//! Tracker entry-point: loads settings, connects the store and serves HTTP.

mod server;

use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tracker::domain::ports::{EventStore, StoreDiagnostics};
use tracker::domain::{ConnectionState, TrackingService};
use tracker::inbound::http::state::HttpState;
use tracker::outbound::memory::{MemoryDiagnostics, MemoryEventStore};
use tracker::outbound::redis::{RedisDiagnostics, RedisEventStore};
use tracker::outbound::webhook::HttpWebhookRelay;
use tracker::settings::{AppSettings, StoreBackend};

use server::{ServerConfig, create_server};

fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

/// Log every connection state change until the sender goes away.
fn watch_connection(mut states: watch::Receiver<ConnectionState>) {
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            match state {
                ConnectionState::GaveUp | ConnectionState::TerminallyFailed => {
                    error!(?state, "store connection is unusable");
                }
                _ => info!(?state, "store connection state changed"),
            }
        }
    });
}

async fn build_store(
    settings: &AppSettings,
) -> Result<(Arc<dyn EventStore>, Arc<dyn StoreDiagnostics>)> {
    match settings.store_backend()? {
        StoreBackend::Redis => {
            let config = settings.redis_config();
            let store = RedisEventStore::connect(&config)
                .await
                .wrap_err_with(|| format!("failed to connect to {}", config.url()))?;
            watch_connection(store.connection_state());
            let diagnostics =
                RedisDiagnostics::new(config.client()?, config.policy.connection_timeout);
            Ok((Arc::new(store), Arc::new(diagnostics)))
        }
        StoreBackend::Memory => {
            warn!("using in-memory store; events are lost on restart");
            Ok((Arc::new(MemoryEventStore::new()), Arc::new(MemoryDiagnostics)))
        }
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let settings =
        AppSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    if settings.log_enabled() {
        init_tracing();
    }
    settings.validate().wrap_err("invalid settings")?;

    let (store, diagnostics) = build_store(&settings).await?;
    let relay = Arc::new(HttpWebhookRelay::new(settings.relay_config()?)?);
    let service = Arc::new(TrackingService::new(
        store,
        diagnostics,
        relay,
        Arc::new(DefaultClock),
        settings.tracking_settings()?,
    )?);

    let config = ServerConfig::new(
        settings.server_host(),
        settings.server_port(),
        HttpState::from_service(service),
    );
    let server = create_server(config)?;
    info!(
        name = settings.server_name(),
        host = settings.server_host(),
        port = settings.server_port(),
        "server listening"
    );
    server.await?;
    Ok(())
}
