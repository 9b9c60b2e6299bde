//! Classification endpoint

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::parse_id;
use crate::error::{ApiError, ApiResult};
use crate::services;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ClassifyParams {
    #[serde(default)]
    pub pretty: bool,
}

/// POST /classify/:doc_id
///
/// Runs detectors and both models. `?pretty=true` returns indented JSON
/// followed by a newline.
pub async fn classify(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(params): Query<ClassifyParams>,
) -> ApiResult<Response> {
    let doc_id = parse_id(&doc_id, "Document")?;
    let result = services::classify_document(&state, doc_id).await?;

    if params.pretty {
        let mut body = serde_json::to_string_pretty(&result)
            .map_err(|e| ApiError::Internal(format!("Failed to render result: {}", e)))?;
        body.push('\n');
        return Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response());
    }
    Ok(Json(result).into_response())
}

pub fn classify_routes() -> Router<AppState> {
    Router::new().route("/classify/:doc_id", post(classify))
}
