//! Classification pipeline
//!
//! Runs the primary multi-prompt chain, asks the secondary model for an
//! independent verdict, reconciles the two and decides whether a human must
//! look at the result.

pub mod fallback;
pub mod orchestrator;
pub mod reconcile;
pub mod review;

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm::{ChatBackend, ChatMessage, LlmError, Role};
use crate::models::{ClassificationResult, DetectorSignals, ExtractedImage, ReviewTrigger};
use crate::policy::Policy;
use reconcile::SecondaryVerdict;
use review::ReviewContext;

/// Everything the classifier needs about one document
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    pub doc_id: Uuid,
    pub pages: &'a BTreeMap<u32, String>,
    pub images: &'a [ExtractedImage],
    pub signals: &'a DetectorSignals,
    pub legibility_score: Option<f64>,
}

/// Result plus the routing decision
#[derive(Debug, Clone)]
pub struct Classification {
    pub result: ClassificationResult,
    pub triggers: Vec<ReviewTrigger>,
}

/// Dual-model document classifier
#[derive(Clone)]
pub struct Classifier {
    primary: Arc<dyn ChatBackend>,
    secondary: Option<Arc<dyn ChatBackend>>,
    policy: Arc<Policy>,
}

impl Classifier {
    pub fn new(
        primary: Arc<dyn ChatBackend>,
        secondary: Option<Arc<dyn ChatBackend>>,
        policy: Arc<Policy>,
    ) -> Self {
        Self {
            primary,
            secondary,
            policy,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub async fn classify(&self, input: ClassificationInput<'_>) -> Classification {
        let run = orchestrator::run_primary(
            self.primary.as_ref(),
            &self.policy,
            input.pages,
            input.signals,
            input.images,
        )
        .await;
        let primary_decision = fallback::decide(&run.final_decision, input.signals);

        let mut payload = Map::new();
        if !run.prompt_errors.is_empty() {
            payload.insert("prompt_errors".into(), json!(run.prompt_errors));
        }
        if primary_decision.is_fallback {
            payload.insert("fallback".into(), Value::Bool(true));
        }

        let secondary = self.run_secondary(input.pages).await;
        let (decision, agreement, secondary_analysis, secondary_flagged) = match secondary {
            Ok((raw, verdict)) => {
                let agreement = reconcile::compute_agreement(&primary_decision, &verdict);
                let merged =
                    reconcile::merge(&primary_decision, &verdict, self.policy.review.primary_weight);
                (merged, Some(agreement), Some(raw), verdict.needs_review)
            }
            Err(e) => {
                if !matches!(e, LlmError::NotConfigured(_)) {
                    warn!(doc_id = %input.doc_id, error = %e, "Secondary review failed");
                }
                payload.insert("secondary_error".into(), Value::String(e.to_string()));
                (primary_decision, None, None, false)
            }
        };

        let summary = (!run.summaries.is_empty()).then(|| {
            Value::Array(
                run.summaries
                    .iter()
                    .map(|(page, summary)| json!({"page": page, "summary": summary}))
                    .collect(),
            )
        });

        let mut result = ClassificationResult {
            doc_id: input.doc_id,
            final_category: decision.final_category,
            secondary_tags: decision.secondary_tags,
            confidence: decision.confidence,
            citations: decision.citations,
            explanation: decision.explanation,
            page_count: input.pages.len(),
            image_count: input.images.len(),
            legibility_score: input.legibility_score,
            content_safety: decision.content_safety,
            raw_signals: input.signals.clone(),
            llm_payload: (!payload.is_empty()).then_some(Value::Object(payload)),
            requires_review: false,
            review_triggers: Vec::new(),
            dual_llm_agreement: agreement.as_ref().map(|a| a.score),
            dual_llm_disagreements: agreement.map(|a| a.disagreements),
            primary_analysis: Some(run.analysis()),
            secondary_analysis,
            summary,
        };

        let context = ReviewContext {
            unsafe_detector: input.signals.has_unsafe_pattern,
            prompt_errors: !run.prompt_errors.is_empty(),
            secondary_flagged,
        };
        let triggers = review::route(&mut result, &context, &self.policy.review);

        info!(
            doc_id = %input.doc_id,
            category = %result.final_category,
            confidence = result.confidence,
            agreement = ?result.dual_llm_agreement,
            requires_review = result.requires_review,
            "Document classified"
        );

        Classification { result, triggers }
    }

    async fn run_secondary(
        &self,
        pages: &BTreeMap<u32, String>,
    ) -> Result<(Value, SecondaryVerdict), LlmError> {
        let backend = self
            .secondary
            .as_ref()
            .ok_or_else(|| LlmError::NotConfigured("secondary model".to_string()))?;
        let prompt = self
            .policy
            .get_prompt("secondary_review")
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let messages = [
            ChatMessage::new(Role::parse(&prompt.role), prompt.content.clone()),
            ChatMessage::user(reconcile::secondary_document_text(pages)),
        ];
        let raw = backend.complete_json(&messages, &[]).await?;
        let verdict = SecondaryVerdict::from_value(&raw)?;
        Ok((raw, verdict))
    }
}
