//! Dashboard endpoint

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::models::DashboardSnapshot;
use crate::services::{self, dashboard::DEFAULT_LIMIT};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub limit: Option<usize>,
}

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Json<DashboardSnapshot> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Json(services::dashboard_snapshot(&state, limit).await)
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}
