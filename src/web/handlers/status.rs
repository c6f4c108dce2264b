use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::web::state::{AppState, Lifecycle};

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub llm_provider: String,
    pub model: String,
    pub uptime_seconds: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub llm_configured: bool,
    pub timestamp: String,
}

pub async fn root(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    let now = chrono::Utc::now();

    Json(ServiceInfo {
        service: "NL-SQL - Text-to-SQL Service",
        version: env!("CARGO_PKG_VERSION"),
        status: match state.lifecycle().await {
            Lifecycle::Initializing => "initializing",
            Lifecycle::Ready => "running",
        },
        llm_provider: state.config.llm.provider.clone(),
        model: state.llm_manager.model().to_string(),
        uptime_seconds: now.signed_duration_since(state.startup_time).num_seconds(),
    })
}

// Never fails: connectivity problems are reported in the body
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let manager = state.db_manager.clone();
    let ping = tokio::task::spawn_blocking(move || manager.ping()).await;

    let database = match ping {
        Ok(Ok(())) => "connected",
        Ok(Err(e)) => {
            warn!("Health check could not reach the database: {}", e);
            "disconnected"
        }
        Err(e) => {
            warn!("Health check task failed: {}", e);
            "disconnected"
        }
    };
    debug!("Health check: database {}", database);

    Json(HealthStatus {
        status: "ok",
        database,
        llm_configured: state
            .config
            .llm
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
