//! Reviewer overrides and the review queue

use chrono::Utc;
use docguard_common::events::DocGuardEvent;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{AuditEvent, DocumentRecord, DocumentStatus, HitlUpdate, ReviewQueueEntry, ReviewStatus};
use crate::AppState;

/// Apply a reviewer's label, close the review item and audit it
///
/// Unknown documents are 404; documents without a classification are 409.
pub async fn submit_review(state: &AppState, update: HitlUpdate) -> ApiResult<DocumentRecord> {
    let record = state.store.apply_review(&update).await?;
    let doc_id = update.doc_id;

    if let Some(result) = &record.classification {
        state.warehouse.insert_classification_record(result).await;
    }
    state
        .warehouse
        .update_doc_status(doc_id, DocumentStatus::Reviewed)
        .await;

    state
        .store
        .close_review(doc_id, &update.reviewer, update.comment.clone())
        .await;
    state
        .warehouse
        .close_review_item(doc_id, &update.reviewer, update.comment.as_deref())
        .await;

    let audit = AuditEvent::new(
        doc_id,
        "hitl_override",
        json!({
            "new_label": update.new_label,
            "reviewer": update.reviewer,
            "comment": update.comment,
        }),
    );
    state.warehouse.insert_audit_event(&audit).await;
    state.store.record_audit(audit).await;

    info!(doc_id = %doc_id, reviewer = %update.reviewer, label = %update.new_label, "Review override applied");
    state.event_bus.emit_lossy(DocGuardEvent::ReviewResolved {
        doc_id,
        reviewer: update.reviewer.clone(),
        new_label: update.new_label.to_string(),
        timestamp: Utc::now(),
    });

    Ok(record)
}

/// Review items from the warehouse when enabled, else from memory
pub async fn review_queue(
    state: &AppState,
    status: Option<ReviewStatus>,
    limit: usize,
) -> Vec<ReviewQueueEntry> {
    if state.warehouse.is_enabled() {
        state.warehouse.list_review_queue(status, limit).await
    } else {
        state.store.list_review_queue(status, limit).await
    }
}

/// Audit trail for one document, newest first
pub async fn audit_trail(state: &AppState, doc_id: Uuid, limit: usize) -> Vec<AuditEvent> {
    if state.warehouse.is_enabled() {
        state.warehouse.list_audit_events(doc_id, limit).await
    } else {
        state.store.audit_events(doc_id, limit).await
    }
}
