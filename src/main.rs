//! Fraud Detection Service
//!
//! HTTP server scoring transactions for fraud risk, backed by Redis for
//! per-account velocity tracking.

use std::sync::Arc;
use tokio::signal;

use fraud_detection_service::clock::SystemClock;
use fraud_detection_service::config::Config;
use fraud_detection_service::routes;
use fraud_detection_service::services::FraudEngine;
use fraud_detection_service::state::AppState;
use fraud_detection_service::store::{RedisVelocityStore, UnavailableStore, VelocityStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        velocity_expiry = config.velocity_expiry.as_str(),
        "Starting fraud detection service"
    );

    // Connect the velocity store; run without it rather than refuse to start
    tracing::info!(url = %config.redis_url_masked(), "Connecting to velocity store...");
    let store: Arc<dyn VelocityStore> = match RedisVelocityStore::connect(
        &config.redis_url,
        config.store_timeout,
        config.velocity_expiry,
    )
    .await
    {
        Ok(store) => {
            tracing::info!("Velocity store connected successfully");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Velocity store unavailable, velocity checks disabled"
            );
            Arc::new(UnavailableStore::new(e.to_string()))
        }
    };

    let fraud_engine = Arc::new(FraudEngine::new(store, Arc::new(SystemClock)));
    let app_state = AppState::new(fraud_engine);

    let app = routes::build_router(
        app_state,
        config.request_timeout,
        config.cors_allowed_origins.as_deref(),
    );

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
