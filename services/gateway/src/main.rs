use std::sync::Arc;

use anyhow::Context as _;
use sea_orm::{ConnectOptions, Database};
use tracing::{info, warn};

use latchkey_core::config::Config;
use latchkey_core::tracing::init_tracing;
use latchkey_gateway::config::{GatewayConfig, StoreBackend};
use latchkey_gateway::infra::delivery::LogLinkDelivery;
use latchkey_gateway::router::build_router;
use latchkey_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env().context("load gateway config")?;
    let settings = config.settings().context("validate gateway config")?;

    if settings.expose_link {
        warn!("EXPOSE_LINK is on: login links are returned to the caller");
    }

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .context("DATABASE_URL is required for the postgres backend")?;
            let mut options = ConnectOptions::new(url);
            options
                .connect_timeout(config.store_timeout())
                .acquire_timeout(config.store_timeout())
                .sqlx_logging(false);
            let db = Database::connect(options)
                .await
                .context("connect to database")?;
            AppState::postgres(db, settings)
        }
        StoreBackend::Memory => {
            warn!("using in-memory stores; sessions will not survive a restart");
            AppState::in_memory(settings, Arc::new(LogLinkDelivery))
        }
    };

    if let Some(every) = config.reap_interval() {
        state.reaper().spawn(every);
    }

    let router = build_router(state, config.request_timeout());
    let addr = format!("0.0.0.0:{}", config.gateway_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!(%addr, backend = ?config.store_backend, "gateway listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
