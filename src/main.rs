//! event-hub server entry point.
//!
//! Starts the Axum HTTP server with the event stream and REST endpoints.

use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use event_hub::api;
use event_hub::app_state::AppState;
use event_hub::config::HubConfig;
use event_hub::heartbeat;
use event_hub::hub::ConnectionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = HubConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting event-hub");

    let registry =
        ConnectionRegistry::with_options(config.client_queue_capacity, config.default_retry_ms);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let heartbeat_task = config.heartbeat_enabled.then(|| {
        tracing::info!(
            interval_secs = config.heartbeat_interval.as_secs(),
            target = ?config.heartbeat_target.as_ref().map(|id| id.as_str()),
            "heartbeat enabled"
        );
        heartbeat::spawn(
            registry.clone(),
            config.heartbeat_interval,
            config.heartbeat_target.clone(),
            shutdown_rx,
        )
    });

    let app_state = AppState {
        registry: registry.clone(),
    };

    let app = api::build_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let shutdown_registry = registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(true);
            // Open streams never finish on their own.
            let closed = shutdown_registry.close_all().await;
            tracing::info!(closed, "closed client streams");
        })
        .await?;

    if let Some(task) = heartbeat_task {
        let _ = task.await;
    }

    Ok(())
}
