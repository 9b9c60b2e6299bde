//! Background batch classification
//!
//! Documents run through the single-document flow with at most
//! `max_concurrency` in flight. Each reports progress 10 → 30 → 60 → 90 → 100;
//! a failing document is marked failed and the rest of the batch continues.

use chrono::Utc;
use docguard_common::events::DocGuardEvent;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{DocumentJobStatus, DocumentStatus, JobStatus};
use crate::services::classification;
use crate::AppState;

pub async fn process_batch_job(state: AppState, job_id: Uuid) {
    let Some(job) = state.store.get_job(job_id).await else {
        warn!(job_id = %job_id, "Batch job disappeared before processing");
        return;
    };
    if let Err(e) = state
        .store
        .update_job_status(job_id, JobStatus::Processing, None)
        .await
    {
        error!(job_id = %job_id, error = %e, "Failed to start batch job");
        return;
    }
    info!(job_id = %job_id, documents = job.doc_ids.len(), "Batch job processing");

    let concurrency = state.config.max_concurrency.max(1);
    stream::iter(job.doc_ids)
        .map(|doc_id| {
            let state = state.clone();
            async move { process_single_document(&state, job_id, doc_id).await }
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<bool>>()
        .await;

    let Some(job) = state.store.get_job(job_id).await else {
        return;
    };
    let (status, error) = if job.failed > 0 {
        (
            JobStatus::Failed,
            Some(format!("{} of {} documents failed", job.failed, job.total_files)),
        )
    } else {
        (JobStatus::Completed, None)
    };
    match state.store.update_job_status(job_id, status, error).await {
        Ok(job) => {
            info!(
                job_id = %job_id,
                status = job.status.as_str(),
                completed = job.completed,
                failed = job.failed,
                "Batch job finished"
            );
            state.event_bus.emit_lossy(DocGuardEvent::JobFinished {
                job_id,
                status: job.status.as_str().to_string(),
                completed: job.completed,
                failed: job.failed,
                timestamp: Utc::now(),
            });
        }
        Err(e) => error!(job_id = %job_id, error = %e, "Failed to finish batch job"),
    }
}

/// Returns whether the document completed
async fn process_single_document(state: &AppState, job_id: Uuid, doc_id: Uuid) -> bool {
    match classify_with_progress(state, job_id, doc_id).await {
        Ok(()) => {
            report(state, job_id, doc_id, DocumentJobStatus::Completed, 100.0, None).await;
            true
        }
        Err(e) => {
            warn!(job_id = %job_id, doc_id = %doc_id, error = %e, "Batch document failed");
            if state.store.set_status(doc_id, DocumentStatus::Failed).await.is_ok() {
                state
                    .warehouse
                    .update_doc_status(doc_id, DocumentStatus::Failed)
                    .await;
            }
            report(
                state,
                job_id,
                doc_id,
                DocumentJobStatus::Failed,
                0.0,
                Some(e.to_string()),
            )
            .await;
            false
        }
    }
}

async fn classify_with_progress(state: &AppState, job_id: Uuid, doc_id: Uuid) -> ApiResult<()> {
    report(state, job_id, doc_id, DocumentJobStatus::Processing, 10.0, None).await;
    let extracted = classification::load_document(state, doc_id).await?;

    report(state, job_id, doc_id, DocumentJobStatus::Processing, 30.0, None).await;
    let signals = state.detectors.run(&extracted.pages);

    report(state, job_id, doc_id, DocumentJobStatus::Processing, 60.0, None).await;
    let result = classification::run_classifier(state, doc_id, &extracted, &signals).await;

    report(state, job_id, doc_id, DocumentJobStatus::Processing, 90.0, None).await;
    classification::record_classification(state, result).await?;
    Ok(())
}

async fn report(
    state: &AppState,
    job_id: Uuid,
    doc_id: Uuid,
    status: DocumentJobStatus,
    progress: f64,
    error: Option<String>,
) {
    match state
        .store
        .update_document_in_job(job_id, doc_id, status, progress, error)
        .await
    {
        Ok(_) => state.event_bus.emit_lossy(DocGuardEvent::JobProgress {
            job_id,
            doc_id,
            status: status.as_str().to_string(),
            progress,
            timestamp: Utc::now(),
        }),
        Err(e) => warn!(job_id = %job_id, doc_id = %doc_id, error = %e, "Progress update dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentRecord, ExtractedDocument};
    use crate::test_support::app_state;
    use crate::warehouse::Warehouse;
    use std::collections::BTreeMap;

    fn text_document(text: &str) -> ExtractedDocument {
        ExtractedDocument {
            pages: BTreeMap::from([(1, text.to_string())]),
            images: Vec::new(),
            legibility_score: Some(1.0),
        }
    }

    async fn stored(state: &AppState, name: &str, extracted: ExtractedDocument) -> DocumentRecord {
        let record = DocumentRecord::new(name.into(), format!("/u/{}", name));
        let record = state.store.insert_document(record, extracted).await;
        state.warehouse.insert_doc_record(&record).await;
        record
    }

    #[tokio::test]
    async fn all_documents_completing_completes_the_job() {
        let root = tempfile::tempdir().unwrap();
        let state = app_state(root.path(), Warehouse::disabled());
        let a = stored(&state, "a.txt", text_document("Lunch menu")).await;
        let b = stored(&state, "b.txt", text_document("SSN 123-45-6789")).await;
        let job = state.store.create_job(vec![a.doc_id, b.doc_id]).await;

        process_batch_job(state.clone(), job.job_id).await;

        let job = state.store.get_job(job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed, 2);
        assert_eq!(job.error, None);
        assert_eq!(job.overall_progress(), 100.0);
    }

    #[tokio::test]
    async fn failing_document_fails_the_job_but_not_the_batch() {
        let root = tempfile::tempdir().unwrap();
        let state = app_state(root.path(), Warehouse::in_memory().await);
        let good = stored(&state, "good.txt", text_document("Quarterly numbers")).await;
        let empty = stored(&state, "empty.txt", ExtractedDocument::default()).await;
        let mut events = state.event_bus.subscribe();
        let job = state.store.create_job(vec![empty.doc_id, good.doc_id]).await;

        process_batch_job(state.clone(), job.job_id).await;

        let job = state.store.get_job(job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.completed, 1);
        assert_eq!(job.failed, 1);
        assert_eq!(job.error.as_deref(), Some("1 of 2 documents failed"));

        let failed = &job.documents[&empty.doc_id];
        assert_eq!(failed.status, DocumentJobStatus::Failed);
        assert_eq!(failed.progress, 0.0);
        assert!(failed
            .error
            .as_deref()
            .unwrap()
            .contains("not found or not processed"));
        let done = &job.documents[&good.doc_id];
        assert_eq!(done.status, DocumentJobStatus::Completed);
        assert_eq!(done.progress, 100.0);

        let empty_record = state.store.get_document(empty.doc_id).await.unwrap();
        assert_eq!(empty_record.status, DocumentStatus::Failed);
        let good_record = state.store.get_document(good.doc_id).await.unwrap();
        assert_eq!(good_record.status, DocumentStatus::Classified);

        let warehouse_docs = state.warehouse.list_documents(10).await;
        let empty_row = warehouse_docs
            .iter()
            .find(|d| d.doc_id == empty.doc_id)
            .unwrap();
        assert_eq!(empty_row.status, DocumentStatus::Failed);

        let mut finished = None;
        while let Ok(event) = events.try_recv() {
            if let DocGuardEvent::JobFinished { status, failed, .. } = event {
                finished = Some((status, failed));
            }
        }
        assert_eq!(finished, Some(("failed".to_string(), 1)));
    }
}
