//! Application state shared across handlers

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::services::FraudEngine;
use crate::store::VelocityStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub fraud_engine: Arc<FraudEngine>,
    /// Same store the engine's velocity tracker uses; kept here for health probes
    pub velocity_store: Arc<dyn VelocityStore>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(fraud_engine: Arc<FraudEngine>) -> Self {
        let velocity_store = fraud_engine.velocity().store().clone();
        Self {
            fraud_engine,
            velocity_store,
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since the state was created
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl FromRef<AppState> for Arc<FraudEngine> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.fraud_engine.clone()
    }
}

impl FromRef<AppState> for Arc<dyn VelocityStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.velocity_store.clone()
    }
}
