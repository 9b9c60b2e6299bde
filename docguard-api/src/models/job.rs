//! Batch job state
//!
//! A job moves PENDING → PROCESSING → COMPLETED, or FAILED when any of its
//! documents failed. Per-document entries carry their own status and
//! progress (0.0 - 100.0).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Batch job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Status of one document within a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentJobStatus::Pending => "pending",
            DocumentJobStatus::Processing => "processing",
            DocumentJobStatus::Completed => "completed",
            DocumentJobStatus::Failed => "failed",
        }
    }
}

/// Per-document progress inside a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProgress {
    pub status: DocumentJobStatus,
    pub progress: f64,
    pub error: Option<String>,
}

impl Default for DocumentProgress {
    fn default() -> Self {
        Self {
            status: DocumentJobStatus::Pending,
            progress: 0.0,
            error: None,
        }
    }
}

/// Batch classification job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// Documents in upload order
    pub doc_ids: Vec<Uuid>,
    pub documents: HashMap<Uuid, DocumentProgress>,
    pub total_files: usize,
    pub completed: usize,
    pub failed: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl BatchJob {
    pub fn new(doc_ids: Vec<Uuid>) -> Self {
        let now = Utc::now();
        let documents = doc_ids
            .iter()
            .map(|id| (*id, DocumentProgress::default()))
            .collect();
        Self {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            total_files: doc_ids.len(),
            doc_ids,
            documents,
            completed: 0,
            failed: 0,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    pub fn transition_to(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Record progress for one document and refresh the completed/failed counters
    ///
    /// Unknown document ids are ignored.
    pub fn update_document(
        &mut self,
        doc_id: Uuid,
        status: DocumentJobStatus,
        progress: f64,
        error: Option<String>,
    ) -> bool {
        let Some(entry) = self.documents.get_mut(&doc_id) else {
            return false;
        };
        entry.status = status;
        entry.progress = progress.clamp(0.0, 100.0);
        entry.error = error;

        self.completed = self
            .documents
            .values()
            .filter(|d| d.status == DocumentJobStatus::Completed)
            .count();
        self.failed = self
            .documents
            .values()
            .filter(|d| d.status == DocumentJobStatus::Failed)
            .count();
        self.updated_at = Utc::now();
        true
    }

    /// Mean of per-document progress
    pub fn overall_progress(&self) -> f64 {
        if self.documents.is_empty() {
            return 0.0;
        }
        self.documents.values().map(|d| d.progress).sum::<f64>() / self.documents.len() as f64
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id,
            status: self.status,
            total_files: self.total_files,
            completed: self.completed,
            failed: self.failed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// POST /batch/upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUploadResponse {
    pub job_id: Uuid,
    pub total_files: usize,
    pub status: JobStatus,
    pub message: String,
}

/// Document row in GET /status/{job_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDocumentStatus {
    pub doc_id: Uuid,
    pub filename: String,
    pub status: DocumentJobStatus,
    pub progress: f64,
    pub error: Option<String>,
}

/// GET /status/{job_id} response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_files: usize,
    pub completed: usize,
    pub failed: usize,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub documents: Vec<JobDocumentStatus>,
    pub error: Option<String>,
}

/// Row in GET /jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_files: usize,
    pub completed: usize,
    pub failed: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
