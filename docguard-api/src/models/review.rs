//! Human review queue and audit trail records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Reasons a classification is sent to a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewTrigger {
    /// Blended confidence under the policy threshold
    LowConfidence,
    /// Unsafe keyword detector fired
    UnsafeDetector,
    /// Final category is Unsafe
    UnsafeCategory,
    /// One or more prompt nodes failed
    PromptErrors,
    /// Dual-model agreement under the policy threshold
    LlmDisagreement,
    /// Secondary model asked for review
    SecondaryFlagged,
}

impl ReviewTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewTrigger::LowConfidence => "low_confidence",
            ReviewTrigger::UnsafeDetector => "unsafe_detector",
            ReviewTrigger::UnsafeCategory => "unsafe_category",
            ReviewTrigger::PromptErrors => "prompt_errors",
            ReviewTrigger::LlmDisagreement => "llm_disagreement",
            ReviewTrigger::SecondaryFlagged => "secondary_flagged",
        }
    }

    pub fn is_safety_related(&self) -> bool {
        matches!(self, ReviewTrigger::UnsafeDetector | ReviewTrigger::UnsafeCategory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPriority {
    Normal,
    High,
}

impl ReviewPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewPriority::Normal => "normal",
            ReviewPriority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Open,
    Closed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Open => "open",
            ReviewStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Some(ReviewStatus::Open),
            "closed" => Some(ReviewStatus::Closed),
            _ => None,
        }
    }
}

/// One review queue entry per document (re-queueing reopens it)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    pub doc_id: Uuid,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub reason_triggers: Vec<String>,
    pub assigned_to: Option<String>,
    pub category: String,
    pub confidence: f64,
    pub priority: ReviewPriority,
    pub resolution_notes: Option<String>,
}

/// Audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub doc_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub event_time: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(doc_id: Uuid, event_type: &str, payload: Value) -> Self {
        Self {
            doc_id,
            event_type: event_type.to_string(),
            payload,
            event_time: Utc::now(),
        }
    }
}
