//! Upload and document lookup endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::parse_id;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuditEvent, DocumentRecord, UploadResponse};
use crate::services::dashboard::DEFAULT_LIMIT;
use crate::services;
use crate::AppState;

/// Collect the files sent under `field_name`, in order
///
/// Parts without a file name are named after the field.
pub(super) async fn collect_files(
    multipart: &mut Multipart,
    field_name: &str,
) -> ApiResult<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(field_name) {
            debug!(field = ?field.name(), "Ignoring multipart field");
            continue;
        }
        let filename = field.file_name().unwrap_or(field_name).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", filename, e)))?;
        files.push((filename, bytes.to_vec()));
    }
    Ok(files)
}

/// POST /upload
///
/// Multipart field `file`. Stores the document and extracts its pages.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let (filename, bytes) = collect_files(&mut multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let record = services::ingest_document(&state, &filename, bytes).await?;
    Ok(Json(UploadResponse {
        doc_id: record.doc_id,
        filename: record.filename,
        page_count: record.page_count,
        image_count: record.image_count,
        legibility_score: record.legibility_score,
        status: record.status,
    }))
}

/// GET /documents/:doc_id
pub async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> ApiResult<Json<DocumentRecord>> {
    let doc_id = parse_id(&doc_id, "Document")?;
    state
        .store
        .get_document(doc_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Document {}", doc_id)))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub total: usize,
    pub documents: Vec<DocumentRecord>,
}

/// GET /documents
pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Json<DocumentListResponse> {
    let documents =
        services::recent_documents(&state, params.limit.unwrap_or(DEFAULT_LIMIT)).await;
    Json(DocumentListResponse {
        total: documents.len(),
        documents,
    })
}

#[derive(Debug, Serialize)]
pub struct AuditTrailResponse {
    pub doc_id: Uuid,
    pub total: usize,
    pub events: Vec<AuditEvent>,
}

/// GET /documents/:doc_id/audit
///
/// Newest first. Answers for documents only the warehouse still knows.
pub async fn document_audit(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<AuditTrailResponse>> {
    let doc_id = parse_id(&doc_id, "Document")?;
    let events =
        services::audit_trail(&state, doc_id, params.limit.unwrap_or(DEFAULT_LIMIT)).await;
    Ok(Json(AuditTrailResponse {
        doc_id,
        total: events.len(),
        events,
    }))
}

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_document))
        .route("/documents", get(list_documents))
        .route("/documents/:doc_id", get(get_document))
        .route("/documents/:doc_id/audit", get(document_audit))
}
