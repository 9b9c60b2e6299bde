//! Batch job bookkeeping

use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::models::{BatchJob, DocumentJobStatus, JobStatus, JobSummary};

impl DocumentStore {
    /// Register a new pending job over `doc_ids`
    pub async fn create_job(&self, doc_ids: Vec<Uuid>) -> BatchJob {
        let job = BatchJob::new(doc_ids);
        self.jobs.write().await.insert(job.job_id, job.clone());
        job
    }

    pub async fn get_job(&self, job_id: Uuid) -> Option<BatchJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Update one document's progress; returns the job's new counters
    pub async fn update_document_in_job(
        &self,
        job_id: Uuid,
        doc_id: Uuid,
        status: DocumentJobStatus,
        progress: f64,
        error: Option<String>,
    ) -> Result<BatchJob, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::JobNotFound(job_id))?;
        if !job.update_document(doc_id, status, progress, error) {
            return Err(StoreError::DocumentNotFound(doc_id));
        }
        Ok(job.clone())
    }

    pub async fn update_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<BatchJob, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::JobNotFound(job_id))?;
        job.transition_to(status);
        if error.is_some() {
            job.error = error;
        }
        Ok(job.clone())
    }

    /// All jobs, newest first
    pub async fn list_jobs(&self) -> Vec<JobSummary> {
        let jobs = self.jobs.read().await;
        let mut list: Vec<JobSummary> = jobs.values().map(BatchJob::summary).collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }
}
