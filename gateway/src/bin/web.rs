//! Relayhook Web Server - webhook ingress for chat and workflow apps.
//!
//! This binary:
//! - Receives webhook/API calls on the invocation routes
//! - Verifies signatures and API keys
//! - Relays normalized inputs to the chat/workflow service
//! - Answers with the service's JSON result

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relayhook::web::{router, AppState};
use relayhook::{Config, HttpInvoker, Pipeline};

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
    let settings = &config.settings;
    info!(
        port = config.port,
        middleware = ?settings.middleware,
        api_key_location = ?settings.api_key_location,
        api_key_configured = settings.api_key.is_some(),
        static_app_id = ?settings.static_app_id(),
        explicit_inputs = settings.explicit_inputs,
        raw_data_output = settings.raw_data_output,
        json_string_input = settings.json_string_input,
        downstream_base_url = %config.downstream_base_url,
        "config_loaded"
    );

    let invoker = HttpInvoker::new(
        &config.downstream_base_url,
        config.downstream_api_key.clone(),
        Duration::from_millis(config.downstream_timeout_ms),
    )
    .context("Failed to create downstream client")?;

    let pipeline = Pipeline::new(config.settings.clone(), Arc::new(invoker))
        .context("Invalid gateway settings")?;

    let app = router(AppState::new(pipeline));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
