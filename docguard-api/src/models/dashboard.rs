//! GET /dashboard snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Category;

/// One document row with its latest classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDocument {
    pub doc_id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub status: String,
    pub page_count: i64,
    pub image_count: i64,
    pub legibility_score: Option<f64>,
    /// Category label, "Unclassified" when never classified
    pub final_category: String,
    pub requires_review: bool,
    pub confidence: Option<f64>,
    pub content_safety: Option<String>,
    pub classified_at: Option<DateTime<Utc>>,
    #[serde(rename = "unsafe")]
    pub is_unsafe: bool,
}

impl DashboardDocument {
    pub const UNCLASSIFIED: &'static str = "Unclassified";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub final_category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCount {
    pub requires_review: bool,
    pub count: i64,
}

/// Grouped counts behind the dashboard tiles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub by_status: Vec<StatusCount>,
    pub by_category: Vec<CategoryCount>,
    pub by_requires_review: Vec<ReviewCount>,
}

impl DashboardSummary {
    fn category(&self, category: Category) -> i64 {
        self.by_category
            .iter()
            .filter(|row| row.final_category == category.as_str())
            .map(|row| row.count)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total: i64,
    pub public: i64,
    pub confidential: i64,
    pub highly_sensitive: i64,
    #[serde(rename = "unsafe")]
    pub unsafe_count: i64,
    pub needs_review: i64,
    /// Mean confidence as a percentage, one decimal
    pub average_confidence: f64,
}

impl DashboardCounts {
    /// Derive tile counts; `fallback_total` applies when no status rows exist
    pub fn derive(summary: &DashboardSummary, fallback_total: usize, avg_confidence: f64) -> Self {
        let status_total: i64 = summary.by_status.iter().map(|row| row.count).sum();
        let needs_review = summary
            .by_requires_review
            .iter()
            .filter(|row| row.requires_review)
            .map(|row| row.count)
            .sum();
        Self {
            total: if status_total > 0 {
                status_total
            } else {
                fallback_total as i64
            },
            public: summary.category(Category::Public),
            confidential: summary.category(Category::Confidential),
            highly_sensitive: summary.category(Category::HighlySensitive),
            unsafe_count: summary.category(Category::Unsafe),
            needs_review,
            average_confidence: (avg_confidence * 1000.0).round() / 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub documents: Vec<DashboardDocument>,
    pub counts: DashboardCounts,
    pub summary: DashboardSummary,
    pub generated_at: DateTime<Utc>,
    pub limit: usize,
}

impl DashboardSnapshot {
    pub fn new(
        documents: Vec<DashboardDocument>,
        summary: DashboardSummary,
        avg_confidence: f64,
        limit: usize,
    ) -> Self {
        let counts = DashboardCounts::derive(&summary, documents.len(), avg_confidence);
        Self {
            documents,
            counts,
            summary,
            generated_at: Utc::now(),
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> DashboardSummary {
        DashboardSummary {
            by_status: vec![
                StatusCount { status: "classified".into(), count: 3 },
                StatusCount { status: "preprocessed".into(), count: 1 },
            ],
            by_category: vec![
                CategoryCount { final_category: "Public".into(), count: 2 },
                CategoryCount { final_category: "Unsafe".into(), count: 1 },
            ],
            by_requires_review: vec![
                ReviewCount { requires_review: true, count: 1 },
                ReviewCount { requires_review: false, count: 2 },
            ],
        }
    }

    #[test]
    fn counts_come_from_summary_rows() {
        let counts = DashboardCounts::derive(&summary(), 0, 0.7234);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.public, 2);
        assert_eq!(counts.confidential, 0);
        assert_eq!(counts.unsafe_count, 1);
        assert_eq!(counts.needs_review, 1);
        assert_eq!(counts.average_confidence, 72.3);
    }

    #[test]
    fn empty_summary_uses_fallback_total() {
        let counts = DashboardCounts::derive(&DashboardSummary::default(), 5, 0.0);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.average_confidence, 0.0);
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let snapshot = DashboardSnapshot::new(vec![], summary(), 0.5, 50);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["counts"]["highlySensitive"], 0);
        assert_eq!(json["counts"]["averageConfidence"], 50.0);
        assert_eq!(json["counts"]["unsafe"], 1);
        assert_eq!(json["limit"], 50);
        assert!(json["generatedAt"].is_string());
        assert_eq!(json["summary"]["by_status"][0]["status"], "classified");
    }
}
