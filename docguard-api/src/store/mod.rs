//! In-memory document, review and job state
//!
//! The service keeps the working set in memory; the warehouse is a durable
//! copy that may be disabled or unavailable.

mod jobs;

use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    AuditEvent, BatchJob, ClassificationResult, DocumentRecord, DocumentStatus, ExtractedDocument,
    HitlUpdate, ReviewQueueEntry, ReviewStatus,
};
use crate::pipeline::review::apply_override;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Document {0} has not been classified yet")]
    NotClassified(Uuid),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),
}

#[derive(Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<Uuid, DocumentRecord>>,
    contents: RwLock<HashMap<Uuid, ExtractedDocument>>,
    review_queue: RwLock<HashMap<Uuid, ReviewQueueEntry>>,
    audit_log: RwLock<Vec<AuditEvent>>,
    jobs: RwLock<HashMap<Uuid, BatchJob>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly extracted document (status `preprocessed`)
    pub async fn insert_document(
        &self,
        mut record: DocumentRecord,
        extracted: ExtractedDocument,
    ) -> DocumentRecord {
        record.page_count = extracted.page_count();
        record.image_count = extracted.image_count();
        record.legibility_score = extracted.legibility_score;
        record.status = DocumentStatus::Preprocessed;
        let doc_id = record.doc_id;
        self.contents.write().await.insert(doc_id, extracted);
        self.documents.write().await.insert(doc_id, record.clone());
        record
    }

    pub async fn get_document(&self, doc_id: Uuid) -> Option<DocumentRecord> {
        self.documents.read().await.get(&doc_id).cloned()
    }

    pub async fn get_extracted(&self, doc_id: Uuid) -> Option<ExtractedDocument> {
        self.contents.read().await.get(&doc_id).cloned()
    }

    pub async fn set_status(&self, doc_id: Uuid, status: DocumentStatus) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let record = documents
            .get_mut(&doc_id)
            .ok_or(StoreError::DocumentNotFound(doc_id))?;
        record.status = status;
        Ok(())
    }

    /// Record the latest classification and mark the document `classified`
    pub async fn save_classification(
        &self,
        result: ClassificationResult,
    ) -> Result<DocumentRecord, StoreError> {
        let mut documents = self.documents.write().await;
        let record = documents
            .get_mut(&result.doc_id)
            .ok_or(StoreError::DocumentNotFound(result.doc_id))?;
        record.status = DocumentStatus::Classified;
        record.classification = Some(result);
        Ok(record.clone())
    }

    /// Apply a reviewer override to the latest classification
    ///
    /// Fails when the document is unknown or was never classified.
    pub async fn apply_review(&self, update: &HitlUpdate) -> Result<DocumentRecord, StoreError> {
        let mut documents = self.documents.write().await;
        let record = documents
            .get_mut(&update.doc_id)
            .ok_or(StoreError::DocumentNotFound(update.doc_id))?;
        let classification = record
            .classification
            .as_mut()
            .ok_or(StoreError::NotClassified(update.doc_id))?;
        apply_override(classification, update);
        record.status = DocumentStatus::Reviewed;
        Ok(record.clone())
    }

    /// Most recently uploaded documents first
    pub async fn list_documents(&self, limit: usize) -> Vec<DocumentRecord> {
        let documents = self.documents.read().await;
        let mut list: Vec<DocumentRecord> = documents.values().cloned().collect();
        list.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        list.truncate(limit);
        list
    }

    /// Open (or reopen) the review item for a document
    pub async fn enqueue_review(&self, mut entry: ReviewQueueEntry) {
        let mut queue = self.review_queue.write().await;
        if let Some(existing) = queue.get(&entry.doc_id) {
            entry.created_at = existing.created_at;
            if entry.assigned_to.is_none() {
                entry.assigned_to = existing.assigned_to.clone();
            }
        }
        entry.status = ReviewStatus::Open;
        entry.last_updated_at = Utc::now();
        queue.insert(entry.doc_id, entry);
    }

    /// Close the review item, if any; returns whether one was open
    pub async fn close_review(&self, doc_id: Uuid, reviewer: &str, notes: Option<String>) -> bool {
        let mut queue = self.review_queue.write().await;
        match queue.get_mut(&doc_id) {
            Some(entry) if entry.status == ReviewStatus::Open => {
                entry.status = ReviewStatus::Closed;
                entry.assigned_to = Some(reviewer.to_string());
                entry.resolution_notes = notes;
                entry.last_updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Review items, high priority first, then oldest first
    pub async fn list_review_queue(
        &self,
        status: Option<ReviewStatus>,
        limit: usize,
    ) -> Vec<ReviewQueueEntry> {
        let queue = self.review_queue.read().await;
        let mut items: Vec<ReviewQueueEntry> = queue
            .values()
            .filter(|e| status.map(|s| e.status == s).unwrap_or(true))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        items.truncate(limit);
        items
    }

    pub async fn record_audit(&self, event: AuditEvent) {
        self.audit_log.write().await.push(event);
    }

    /// Audit trail for one document, newest first
    pub async fn audit_events(&self, doc_id: Uuid, limit: usize) -> Vec<AuditEvent> {
        self.audit_log
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.doc_id == doc_id)
            .take(limit)
            .cloned()
            .collect()
    }
}
