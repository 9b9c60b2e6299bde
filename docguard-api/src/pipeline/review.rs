//! Human review routing and reviewer overrides

use crate::models::{Category, ClassificationResult, HitlUpdate, ReviewPriority, ReviewTrigger};
use crate::policy::ReviewThresholds;

/// Inputs to the review decision beyond the result itself
#[derive(Debug, Clone, Default)]
pub struct ReviewContext {
    pub unsafe_detector: bool,
    pub prompt_errors: bool,
    pub secondary_flagged: bool,
}

/// Every trigger that applies to a classification, in a stable order
pub fn review_triggers(
    result: &ClassificationResult,
    context: &ReviewContext,
    thresholds: &ReviewThresholds,
) -> Vec<ReviewTrigger> {
    let mut triggers = Vec::new();
    if result.confidence < thresholds.confidence_threshold {
        triggers.push(ReviewTrigger::LowConfidence);
    }
    if context.unsafe_detector {
        triggers.push(ReviewTrigger::UnsafeDetector);
    }
    if result.final_category == Category::Unsafe {
        triggers.push(ReviewTrigger::UnsafeCategory);
    }
    if context.prompt_errors {
        triggers.push(ReviewTrigger::PromptErrors);
    }
    if result
        .dual_llm_agreement
        .map(|a| a < thresholds.agreement_threshold)
        .unwrap_or(false)
    {
        triggers.push(ReviewTrigger::LlmDisagreement);
    }
    if context.secondary_flagged {
        triggers.push(ReviewTrigger::SecondaryFlagged);
    }
    triggers
}

/// High when any trigger concerns safety
pub fn review_priority(triggers: &[ReviewTrigger]) -> ReviewPriority {
    if triggers.iter().any(ReviewTrigger::is_safety_related) {
        ReviewPriority::High
    } else {
        ReviewPriority::Normal
    }
}

/// Set `requires_review` and `review_triggers` on a result
pub fn route(
    result: &mut ClassificationResult,
    context: &ReviewContext,
    thresholds: &ReviewThresholds,
) -> Vec<ReviewTrigger> {
    let triggers = review_triggers(result, context, thresholds);
    result.requires_review = !triggers.is_empty();
    result.review_triggers = triggers.iter().map(|t| t.as_str().to_string()).collect();
    triggers
}

/// Apply a reviewer's label to the latest classification
///
/// The reviewer's decision is final, so the result no longer needs review.
pub fn apply_override(result: &mut ClassificationResult, update: &HitlUpdate) {
    result.final_category = update.new_label;
    result.explanation.push_str(&format!(
        "\n[HITL Override by {}]: {}",
        update.reviewer,
        update.comment.as_deref().unwrap_or_default()
    ));
    result.requires_review = false;
}
