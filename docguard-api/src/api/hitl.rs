//! Human review endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::models::{HitlUpdate, ReviewQueueEntry, ReviewStatus};
use crate::services;
use crate::AppState;

const DEFAULT_QUEUE_LIMIT: usize = 50;

/// POST /hitl
pub async fn hitl_override(
    State(state): State<AppState>,
    Json(update): Json<HitlUpdate>,
) -> ApiResult<Json<Value>> {
    services::submit_review(&state, update).await?;
    Ok(Json(json!({"status": "ok"})))
}

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    /// `open` (default), `closed` or `all`
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub total: usize,
    pub items: Vec<ReviewQueueEntry>,
}

/// GET /hitl/queue
pub async fn review_queue(
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
) -> ApiResult<Json<QueueResponse>> {
    let status = match params.status.as_deref() {
        None => Some(ReviewStatus::Open),
        Some(s) if s.eq_ignore_ascii_case("all") => None,
        Some(s) => Some(ReviewStatus::parse(s).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown review status '{}'", s))
        })?),
    };
    let limit = params.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    let items = services::review_queue(&state, status, limit).await;
    Ok(Json(QueueResponse {
        total: items.len(),
        items,
    }))
}

pub fn hitl_routes() -> Router<AppState> {
    Router::new()
        .route("/hitl", post(hitl_override))
        .route("/hitl/queue", get(review_queue))
}
