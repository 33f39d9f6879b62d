#![warn(clippy::pedantic)]

use roster_web::error::MainError;
use roster_web::{AppState, router};
use shared::duties::api::DutyClient;
use shared::error::InitializationError;
use shared::{init_tracing, load_config, shutdown_listener};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), MainError> {
    init_tracing()?;

    let config = load_config().map_err(InitializationError::from)?;
    let locale = config
        .roster
        .display_locale()
        .map_err(InitializationError::from)?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(InitializationError::from)?;
    let duty_client = DutyClient::new_with_client(http_client, &config.duty_service.base_url);
    info!(base_url = duty_client.base_url(), "using duty service");

    let state = AppState::new(duty_client, &config.roster, locale);
    state.reload_duties();

    // Cancelled by the signal listener on SIGINT/SIGTERM.
    let shutdown_token = CancellationToken::new();
    let signal_handle = tokio::spawn(shutdown_listener(Some(shutdown_token.clone())));

    let listener = TcpListener::bind(&config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "starting roster server");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await?;

    signal_handle.abort();
    Ok(())
}
