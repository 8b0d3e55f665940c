// =============================================================================
// market-pulse — multi-tenant real-time market-simulation server
// =============================================================================
//
// Each browser tab that connects over `/ws` gets its own `SessionState`:
// its own synthetic price process, its own multi-timeframe candle cache, and
// its own synthetic depth book. A single `SessionDispatcher` walks every
// session roughly every 50 ms and pushes batched tick frames at each
// session's own effective cadence (spec.md §2).
// =============================================================================

mod candles;
mod clamp;
mod commands;
mod config;
mod dispatcher;
mod encoding;
mod housekeeping;
mod news_shock;
mod orderbook;
mod price_engine;
mod registry;
mod server;
mod session;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!(port = config.port, "market-pulse starting up");

    let state = Arc::new(AppState::new(config));

    let dispatcher_state = state.clone();
    tokio::spawn(async move {
        dispatcher::run(dispatcher_state).await;
    });

    let timeout_state = state.clone();
    tokio::spawn(async move {
        housekeeping::run_timeout_sweep(timeout_state).await;
    });

    let summary_state = state.clone();
    tokio::spawn(async move {
        housekeeping::run_summary_log(summary_state).await;
    });

    let app = server::routes::router(state.clone());
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
