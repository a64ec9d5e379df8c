use anyhow::Context;
use tracing::{info, warn, Level};

mod client;
mod models;
mod routes;
mod state;
mod utils;

use pm_stream::SampleStream;

use crate::client::records::RecordClient;
use crate::state::app_state::AppState;
use crate::utils::conf_helper::{get_cached_config, init_config_and_bind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    // === CONFIG + LISTENER ===
    let listener = init_config_and_bind()
        .await
        .context("CRITICAL INIT FAILURE")?;

    let config = get_cached_config();

    info!(
        "Server initialized on {}:{}",
        config.connection.ip,
        config.connection.port
    );

    let stream = SampleStream::new(config.stream.signals.clone(), config.stream.options())
        .context("invalid stream configuration")?;
    let handle = stream.start();

    let records = config.records.as_ref().map(RecordClient::new);
    if records.is_none() {
        warn!("No record store configured, upload and analysis routes disabled");
    }

    let fleet = config.fleet.clone().unwrap_or_default();
    let state = AppState::new(handle, records, fleet);

    let app = routes::app(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.stream.teardown();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("ctrl-c handler failed: {}", e);
    }
    info!("Shutdown requested");
}
