//! Route definitions for the fraud detection API

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{check_fraud, health_check, service_info};
use crate::middleware;
use crate::state::AppState;

// Fraud check routes
pub fn fraud_routes() -> Router<AppState> {
    Router::new().route("/api/v1.0/fraud/check", post(check_fraud))
}

// Service description and liveness
pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
}

/// Full application router with its middleware stack
pub fn build_router(
    state: AppState,
    request_timeout: Duration,
    cors_allowed_origins: Option<&str>,
) -> Router {
    Router::new()
        .merge(system_routes())
        .merge(fraud_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(middleware::configure_cors(cors_allowed_origins))
}
