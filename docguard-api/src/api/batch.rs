//! Batch upload and job tracking endpoints

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::documents::collect_files;
use super::parse_id;
use crate::error::{ApiError, ApiResult};
use crate::models::{BatchUploadResponse, JobDocumentStatus, JobStatusResponse, JobSummary};
use crate::services;
use crate::AppState;

/// POST /batch/upload
///
/// Multipart field `files`, repeated. Classification runs in the background.
pub async fn batch_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<BatchUploadResponse>> {
    let files = collect_files(&mut multipart, "files").await?;
    let response = services::ingest_batch(&state, files).await?;
    Ok(Json(response))
}

/// GET /status/:job_id
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job_id = parse_id(&job_id, "Job")?;
    let job = state
        .store
        .get_job(job_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Job {}", job_id)))?;

    let mut documents = Vec::with_capacity(job.doc_ids.len());
    for doc_id in &job.doc_ids {
        let filename = state
            .store
            .get_document(*doc_id)
            .await
            .map(|record| record.filename)
            .unwrap_or_else(|| "unknown".to_string());
        let progress = job.documents.get(doc_id).cloned().unwrap_or_default();
        documents.push(JobDocumentStatus {
            doc_id: *doc_id,
            filename,
            status: progress.status,
            progress: progress.progress,
            error: progress.error,
        });
    }

    Ok(Json(JobStatusResponse {
        job_id: job.job_id,
        status: job.status,
        total_files: job.total_files,
        completed: job.completed,
        failed: job.failed,
        progress: job.overall_progress(),
        created_at: job.created_at,
        updated_at: job.updated_at,
        documents,
        error: job.error,
    }))
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub total: usize,
    pub jobs: Vec<JobSummary>,
}

/// GET /jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    let jobs = state.store.list_jobs().await;
    Json(JobListResponse {
        total: jobs.len(),
        jobs,
    })
}

pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batch/upload", post(batch_upload))
        .route("/status/:job_id", get(job_status))
        .route("/jobs", get(list_jobs))
}
