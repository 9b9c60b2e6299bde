//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub git_hash: &'static str,
    pub timestamp: &'static str,
    pub profile: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" while the service answers
    pub status: String,
    pub module: String,
    pub version: String,
    pub build: BuildInfo,
    pub uptime_seconds: u64,
    pub warehouse_enabled: bool,
    pub primary_model_configured: bool,
    pub secondary_model_configured: bool,
    /// Open `/events` streams
    pub event_subscribers: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "docguard-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: BuildInfo {
            git_hash: env!("DOCGUARD_GIT_HASH"),
            timestamp: env!("DOCGUARD_BUILD_TIMESTAMP"),
            profile: env!("DOCGUARD_BUILD_PROFILE"),
        },
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        warehouse_enabled: state.warehouse.is_enabled(),
        primary_model_configured: state.config.primary_llm.is_configured(),
        secondary_model_configured: state.config.secondary_llm.is_configured(),
        event_subscribers: state.event_bus.subscriber_count(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
