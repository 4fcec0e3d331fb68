//! Analysis bridge web server.
//!
//! Dispatches stored policies to the analysis service with a signed request
//! and accepts the signed analysis results it posts back.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use analysis_bridge::{router, AnalysisClient, AppState, Config, PolicyStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        webhook_secret_configured = config.webhook_secret.is_configured(),
        service_role_key_configured = config.service_role_key.is_configured(),
        analysis_api_url = %config.analysis_api_url,
        callback_url = %config.callback_url(),
        request_timeout_ms = config.request_timeout_ms,
        "config_loaded"
    );

    if !config.webhook_secret.is_configured() {
        warn!("webhook_secret_not_configured_callbacks_unverified");
    }

    let store = match &config.policy_seed_path {
        Some(path) => PolicyStore::load_json(path)
            .await
            .context("Failed to load policy seed file")?,
        None => PolicyStore::new(),
    };

    // Shared HTTP client for all outbound requests
    let http = Client::builder()
        .pool_max_idle_per_host(16)
        .build()
        .context("Failed to create HTTP client")?;

    let client = AnalysisClient::new(
        http,
        config.analysis_api_url.clone(),
        config.webhook_secret.clone(),
        Duration::from_millis(config.request_timeout_ms),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, store, client));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
