//! Dashboard snapshot from the warehouse, or from memory when it is disabled

use std::collections::BTreeMap;

use crate::models::{
    CategoryCount, DashboardDocument, DashboardSnapshot, DashboardSummary, DocumentRecord,
    ReviewCount, StatusCount,
};
use crate::AppState;

pub const DEFAULT_LIMIT: usize = 50;

pub async fn dashboard_snapshot(state: &AppState, limit: usize) -> DashboardSnapshot {
    if state.warehouse.is_enabled() {
        return state.warehouse.dashboard_snapshot(limit).await;
    }
    let documents = state.store.list_documents(usize::MAX).await;
    snapshot_from_records(&documents, limit)
}

/// Most recent uploads first; warehouse rows carry no classification
pub async fn recent_documents(state: &AppState, limit: usize) -> Vec<DocumentRecord> {
    if state.warehouse.is_enabled() {
        state.warehouse.list_documents(limit).await
    } else {
        state.store.list_documents(limit).await
    }
}

fn dashboard_row(record: &DocumentRecord) -> DashboardDocument {
    let classification = record.classification.as_ref();
    let final_category = classification
        .map(|c| c.final_category.to_string())
        .unwrap_or_else(|| DashboardDocument::UNCLASSIFIED.to_string());
    DashboardDocument {
        doc_id: record.doc_id,
        filename: record.filename.clone(),
        uploaded_at: record.uploaded_at,
        status: record.status.as_str().to_string(),
        page_count: record.page_count as i64,
        image_count: record.image_count as i64,
        legibility_score: record.legibility_score,
        requires_review: classification.map(|c| c.requires_review).unwrap_or(false),
        confidence: classification.map(|c| c.confidence),
        content_safety: classification.map(|c| c.content_safety.clone()),
        // The in-memory store keeps no classification timestamp
        classified_at: None,
        is_unsafe: final_category == "Unsafe",
        final_category,
    }
}

/// Build the snapshot from newest-first records
fn snapshot_from_records(records: &[DocumentRecord], limit: usize) -> DashboardSnapshot {
    let mut by_status: BTreeMap<&str, i64> = BTreeMap::new();
    let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
    let mut by_review: BTreeMap<bool, i64> = BTreeMap::new();
    let mut confidence_sum = 0.0;
    let mut classified = 0usize;

    for record in records {
        *by_status.entry(record.status.as_str()).or_default() += 1;
        if let Some(result) = &record.classification {
            *by_category.entry(result.final_category.to_string()).or_default() += 1;
            *by_review.entry(result.requires_review).or_default() += 1;
            confidence_sum += result.confidence;
            classified += 1;
        }
    }

    let summary = DashboardSummary {
        by_status: by_status
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect(),
        by_category: by_category
            .into_iter()
            .map(|(final_category, count)| CategoryCount {
                final_category,
                count,
            })
            .collect(),
        by_requires_review: by_review
            .into_iter()
            .map(|(requires_review, count)| ReviewCount {
                requires_review,
                count,
            })
            .collect(),
    };
    let average = if classified > 0 {
        confidence_sum / classified as f64
    } else {
        0.0
    };
    let documents = records.iter().take(limit).map(dashboard_row).collect();
    DashboardSnapshot::new(documents, summary, average, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, DocumentStatus};
    use crate::warehouse::fixtures::classification;

    fn record(name: &str, result: Option<(Category, f64, bool)>) -> DocumentRecord {
        let mut record = DocumentRecord::new(name.into(), format!("/u/{}", name));
        record.page_count = 1;
        if let Some((category, confidence, review)) = result {
            let mut c = classification(record.doc_id, category, confidence);
            c.requires_review = review;
            record.classification = Some(c);
            record.status = DocumentStatus::Classified;
        } else {
            record.status = DocumentStatus::Preprocessed;
        }
        record
    }

    #[test]
    fn counts_cover_all_records_but_rows_respect_limit() {
        let records = vec![
            record("a.pdf", Some((Category::Unsafe, 0.9, true))),
            record("b.pdf", Some((Category::Public, 0.7, false))),
            record("c.pdf", None),
        ];
        let snapshot = snapshot_from_records(&records, 2);

        assert_eq!(snapshot.documents.len(), 2);
        assert!(snapshot.documents[0].is_unsafe);
        assert_eq!(snapshot.counts.total, 3);
        assert_eq!(snapshot.counts.unsafe_count, 1);
        assert_eq!(snapshot.counts.public, 1);
        assert_eq!(snapshot.counts.needs_review, 1);
        assert_eq!(snapshot.counts.average_confidence, 80.0);
    }

    #[test]
    fn unclassified_rows_are_labelled() {
        let snapshot = snapshot_from_records(&[record("c.pdf", None)], 50);
        let row = &snapshot.documents[0];
        assert_eq!(row.final_category, "Unclassified");
        assert_eq!(row.confidence, None);
        assert!(!row.requires_review);
        assert_eq!(snapshot.counts.average_confidence, 0.0);
    }
}
