//! Single-document classification flow
//!
//! load → detectors → classifier → record. The batch processor calls the
//! steps one by one to report progress in between.

use chrono::Utc;
use docguard_common::events::DocGuardEvent;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    AuditEvent, ClassificationResult, DetectorSignals, DocumentStatus, ExtractedDocument,
    ReviewQueueEntry, ReviewStatus,
};
use crate::pipeline::review::review_priority;
use crate::pipeline::{Classification, ClassificationInput};
use crate::AppState;

/// Extracted content of a preprocessed document
pub async fn load_document(state: &AppState, doc_id: Uuid) -> ApiResult<ExtractedDocument> {
    state
        .store
        .get_extracted(doc_id)
        .await
        .filter(ExtractedDocument::has_content)
        .ok_or_else(|| {
            ApiError::NotFound(format!("Document {} not found or not processed", doc_id))
        })
}

pub async fn run_classifier(
    state: &AppState,
    doc_id: Uuid,
    extracted: &ExtractedDocument,
    signals: &DetectorSignals,
) -> Classification {
    state
        .classifier
        .classify(ClassificationInput {
            doc_id,
            pages: &extracted.pages,
            images: &extracted.images,
            signals,
            legibility_score: extracted.legibility_score,
        })
        .await
}

/// Persist a classification and queue it for review when required
pub async fn record_classification(
    state: &AppState,
    classification: Classification,
) -> ApiResult<ClassificationResult> {
    let Classification { result, triggers } = classification;
    let doc_id = result.doc_id;

    state.store.save_classification(result.clone()).await?;
    state.warehouse.insert_classification_record(&result).await;
    state
        .warehouse
        .update_doc_status(doc_id, DocumentStatus::Classified)
        .await;

    let audit = AuditEvent::new(
        doc_id,
        "auto_classification",
        json!({
            "final_category": result.final_category,
            "confidence": result.confidence,
            "requires_review": result.requires_review,
            "review_triggers": result.review_triggers,
            "dual_llm_agreement": result.dual_llm_agreement,
        }),
    );
    state.warehouse.insert_audit_event(&audit).await;
    state.store.record_audit(audit).await;

    if result.requires_review {
        let now = Utc::now();
        let priority = review_priority(&triggers);
        let entry = ReviewQueueEntry {
            doc_id,
            status: ReviewStatus::Open,
            created_at: now,
            last_updated_at: now,
            reason_triggers: result.review_triggers.clone(),
            assigned_to: None,
            category: result.final_category.to_string(),
            confidence: result.confidence,
            priority,
            resolution_notes: None,
        };
        state.warehouse.upsert_review_queue(&entry).await;
        state.store.enqueue_review(entry).await;
        info!(doc_id = %doc_id, priority = priority.as_str(), triggers = ?result.review_triggers, "Queued for review");
        state.event_bus.emit_lossy(DocGuardEvent::ReviewQueued {
            doc_id,
            priority: priority.as_str().to_string(),
            triggers: result.review_triggers.clone(),
            timestamp: now,
        });
    }

    state
        .event_bus
        .emit_lossy(DocGuardEvent::ClassificationCompleted {
            doc_id,
            final_category: result.final_category.to_string(),
            confidence: result.confidence,
            requires_review: result.requires_review,
            dual_llm_agreement: result.dual_llm_agreement,
            timestamp: Utc::now(),
        });

    Ok(result)
}

/// Classify a stored document end to end
pub async fn classify_document(state: &AppState, doc_id: Uuid) -> ApiResult<ClassificationResult> {
    let extracted = load_document(state, doc_id).await?;
    let signals = state.detectors.run(&extracted.pages);
    let classification = run_classifier(state, doc_id, &extracted, &signals).await;
    record_classification(state, classification).await
}
