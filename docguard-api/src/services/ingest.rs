//! Document intake: store the upload, extract its content, register it

use chrono::Utc;
use docguard_common::events::DocGuardEvent;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::extraction::extract_document;
use crate::models::{BatchUploadResponse, DocumentRecord, ExtractedDocument, JobStatus};
use crate::services::batch_processor;
use crate::AppState;

const FALLBACK_FILENAME: &str = "upload";

/// Reduce a client-supplied name to a safe file name
///
/// Drops any directory part and replaces characters outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Save, extract and register one uploaded file
///
/// Fails with 400 when nothing could be extracted.
pub async fn ingest_document(
    state: &AppState,
    filename: &str,
    bytes: Vec<u8>,
) -> ApiResult<DocumentRecord> {
    let safe_name = sanitize_filename(filename);
    tokio::fs::create_dir_all(&state.config.uploads_dir).await?;

    let mut record = DocumentRecord::new(safe_name.clone(), String::new());
    let path = state
        .config
        .uploads_dir
        .join(format!("{}_{}", record.doc_id, safe_name));
    tokio::fs::write(&path, &bytes).await?;
    record.source_path = path.display().to_string();

    let extracted = match extract_in_background(path.clone(), bytes).await {
        Ok(extracted) if extracted.has_content() => extracted,
        Ok(_) => {
            warn!(doc_id = %record.doc_id, filename = %safe_name, "No content extracted");
            discard_upload(&path).await;
            return Err(ApiError::BadRequest("Unable to extract content.".to_string()));
        }
        Err(e) => {
            warn!(doc_id = %record.doc_id, filename = %safe_name, error = %e, "Extraction failed");
            discard_upload(&path).await;
            return Err(e);
        }
    };

    let record = state.store.insert_document(record, extracted).await;
    state.warehouse.insert_doc_record(&record).await;
    info!(
        doc_id = %record.doc_id,
        filename = %record.filename,
        pages = record.page_count,
        images = record.image_count,
        "Document preprocessed"
    );
    state.event_bus.emit_lossy(DocGuardEvent::DocumentUploaded {
        doc_id: record.doc_id,
        filename: record.filename.clone(),
        page_count: record.page_count,
        image_count: record.image_count,
        timestamp: Utc::now(),
    });
    Ok(record)
}

async fn extract_in_background(path: PathBuf, bytes: Vec<u8>) -> ApiResult<ExtractedDocument> {
    let extracted = tokio::task::spawn_blocking(move || extract_document(&path, &bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Extraction task failed: {}", e)))??;
    Ok(extracted)
}

/// Remove a rejected upload from disk
async fn discard_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove rejected upload");
    }
}

/// Ingest several files and start a background classification job
///
/// Files that fail to ingest are skipped and named in the message; the call
/// fails only when none succeed.
pub async fn ingest_batch(
    state: &AppState,
    files: Vec<(String, Vec<u8>)>,
) -> ApiResult<BatchUploadResponse> {
    if files.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }

    let mut doc_ids = Vec::with_capacity(files.len());
    let mut failed_uploads = Vec::new();
    for (filename, bytes) in files {
        match ingest_document(state, &filename, bytes).await {
            Ok(record) => doc_ids.push(record.doc_id),
            Err(e) => {
                warn!(filename = %filename, error = %e, "Batch upload skipped file");
                failed_uploads.push(filename);
            }
        }
    }

    if doc_ids.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "All uploads failed. Files: {}",
            failed_uploads.join(", ")
        )));
    }

    let job = state.store.create_job(doc_ids).await;
    info!(job_id = %job.job_id, documents = job.total_files, "Batch job created");
    tokio::spawn(batch_processor::process_batch_job(state.clone(), job.job_id));

    let mut message = format!(
        "Batch upload initiated. Successfully queued {} documents.",
        job.total_files
    );
    if !failed_uploads.is_empty() {
        message.push_str(&format!(" Failed: {}", failed_uploads.join(", ")));
    }

    Ok(BatchUploadResponse {
        job_id: job.job_id,
        total_files: job.total_files,
        status: JobStatus::Pending,
        message,
    })
}
