//! Sensitivity categories and classification records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Sensitivity tier assigned to a document
///
/// Ordered by severity: Public < Confidential < Highly Sensitive < Unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Public")]
    Public,
    #[serde(rename = "Confidential")]
    Confidential,
    #[serde(rename = "Highly Sensitive")]
    HighlySensitive,
    #[serde(rename = "Unsafe")]
    Unsafe,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Public,
        Category::Confidential,
        Category::HighlySensitive,
        Category::Unsafe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Public => "Public",
            Category::Confidential => "Confidential",
            Category::HighlySensitive => "Highly Sensitive",
            Category::Unsafe => "Unsafe",
        }
    }

    /// 0 (Public) through 3 (Unsafe)
    pub fn severity(&self) -> u8 {
        match self {
            Category::Public => 0,
            Category::Confidential => 1,
            Category::HighlySensitive => 2,
            Category::Unsafe => 3,
        }
    }

    /// Lenient parse of a model-produced label
    ///
    /// Accepts any casing and `_`/`-` in place of the space.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
            .collect();
        match normalized.as_str() {
            "public" => Some(Category::Public),
            "confidential" => Some(Category::Confidential),
            "highly sensitive" => Some(Category::HighlySensitive),
            "unsafe" => Some(Category::Unsafe),
            _ => None,
        }
    }

    /// The more severe of two categories
    pub fn max_severity(self, other: Category) -> Category {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence pointer into a document page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub page: u32,
    pub snippet: String,
    /// Which component produced the citation (detector_pii, secondary_llm, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Citation {
    pub fn new(page: u32, snippet: impl Into<String>) -> Self {
        Self {
            page,
            snippet: snippet.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

/// Output of the keyword/regex detectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorSignals {
    pub has_pii: bool,
    pub pii_hits: Vec<Citation>,
    pub has_unsafe_pattern: bool,
    pub unsafe_hits: Vec<Citation>,
    pub has_internal_markers: bool,
    pub notes: Vec<String>,
}

/// Final classification for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub doc_id: Uuid,
    pub final_category: Category,
    pub secondary_tags: Vec<String>,
    pub confidence: f64,
    pub citations: Vec<Citation>,
    pub explanation: String,
    pub page_count: usize,
    pub image_count: usize,
    pub legibility_score: Option<f64>,
    pub content_safety: String,
    pub raw_signals: DetectorSignals,
    /// Pipeline diagnostics (prompt errors, secondary failures)
    pub llm_payload: Option<Value>,
    pub requires_review: bool,
    pub review_triggers: Vec<String>,
    /// 0.0 - 1.0 agreement between the two models; None when only one answered
    pub dual_llm_agreement: Option<f64>,
    /// Fields on which the two models disagree
    pub dual_llm_disagreements: Option<Vec<String>>,
    pub primary_analysis: Option<Value>,
    pub secondary_analysis: Option<Value>,
    pub summary: Option<Value>,
}

/// POST /hitl request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlUpdate {
    pub doc_id: Uuid,
    pub new_label: Category,
    pub reviewer: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_with_display_names() {
        let json = serde_json::to_string(&Category::HighlySensitive).unwrap();
        assert_eq!(json, "\"Highly Sensitive\"");
        let parsed: Category = serde_json::from_str("\"Unsafe\"").unwrap();
        assert_eq!(parsed, Category::Unsafe);
    }

    #[test]
    fn from_label_is_lenient() {
        assert_eq!(Category::from_label("highly_sensitive"), Some(Category::HighlySensitive));
        assert_eq!(Category::from_label(" CONFIDENTIAL "), Some(Category::Confidential));
        assert_eq!(Category::from_label("Highly-Sensitive"), Some(Category::HighlySensitive));
        assert_eq!(Category::from_label("secret"), None);
    }

    #[test]
    fn max_severity_prefers_stricter_tier() {
        assert_eq!(Category::Public.max_severity(Category::Confidential), Category::Confidential);
        assert_eq!(Category::Unsafe.max_severity(Category::HighlySensitive), Category::Unsafe);
        assert_eq!(Category::Public.max_severity(Category::Public), Category::Public);
    }

    #[test]
    fn citation_source_is_omitted_when_absent() {
        let json = serde_json::to_value(Citation::new(2, "text")).unwrap();
        assert!(json.get("source").is_none());
        let json = serde_json::to_value(Citation::new(2, "text").with_source("detector_pii")).unwrap();
        assert_eq!(json["source"], "detector_pii");
    }
}
