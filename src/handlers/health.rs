//! Liveness and service description handlers

use axum::{extract::State, Json};
use chrono::Utc;
use std::collections::BTreeMap;

use crate::models::{HealthResponse, ServiceInfo};
use crate::state::AppState;

pub const SERVICE_NAME: &str = "Fraud Detection Service";

/// GET /health - Liveness plus velocity store reachability
///
/// Always 200: the service keeps scoring without its store.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let velocity_store = match state.velocity_store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Velocity store ping failed");
            false
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime_seconds: state.uptime_seconds(),
        velocity_store,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET / - Service name, version and endpoint map
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    let connected = state.velocity_store.ping().await.is_ok();

    let mut endpoints = BTreeMap::new();
    endpoints.insert("health".to_string(), "/health".to_string());
    endpoints.insert("check".to_string(), "/api/v1.0/fraud/check".to_string());

    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        velocity_store: if connected { "Connected" } else { "Not Connected" }.to_string(),
        endpoints,
    })
}
