//! Dual-model reconciliation
//!
//! Scores how closely the secondary reviewer agrees with the primary
//! decision, lists the fields on which they differ, and merges both into one
//! verdict. Severity always wins a label conflict.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::fallback::{number, Decision, SAFE_CONTENT};
use crate::llm::LlmError;
use crate::models::{Category, Citation};

/// Character cap on the text sent to the secondary reviewer
pub const SECONDARY_TEXT_CHARS: usize = 12_000;

const LABEL_WEIGHT: f64 = 0.50;
const CONFIDENCE_WEIGHT: f64 = 0.20;
const SAFETY_WEIGHT: f64 = 0.15;
const CITATION_WEIGHT: f64 = 0.15;

/// Confidence gap reported as a disagreement
const CONFIDENCE_GAP: f64 = 0.2;
/// Citation overlap below this is reported as a disagreement
const CITATION_OVERLAP: f64 = 0.5;
/// Minimum similarity for a misspelled label to count
const LABEL_SIMILARITY: f64 = 0.8;

/// Parsed secondary reviewer verdict
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryVerdict {
    pub model: Option<String>,
    pub label: Category,
    pub confidence: f64,
    pub rationale: String,
    pub content_safety: String,
    pub critical_info: Vec<String>,
    pub needs_review: bool,
    pub citations: Vec<Citation>,
}

impl SecondaryVerdict {
    pub fn from_value(value: &Value) -> Result<Self, LlmError> {
        let label_text = value
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::Parse("secondary verdict has no label".to_string()))?;
        let label = parse_label(label_text)
            .ok_or_else(|| LlmError::Parse(format!("unknown label {:?}", label_text)))?;

        let confidence = value
            .get("confidence")
            .and_then(number)
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);

        let citations = value
            .get("citations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|c| {
                        let page = c.get("page").and_then(number).filter(|p| *p >= 1.0)?;
                        let evidence = c
                            .get("evidence")
                            .or_else(|| c.get("snippet"))
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        Some(Citation::new(page as u32, evidence).with_source("secondary_llm"))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            model: value.get("model").and_then(Value::as_str).map(String::from),
            label,
            confidence,
            rationale: string_field(value, "rationale"),
            content_safety: string_field(value, "content_safety"),
            critical_info: value
                .get("critical_info")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            needs_review: value
                .get("needs_review")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            citations,
        })
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Exact label match first, then the closest category by edit distance
fn parse_label(label: &str) -> Option<Category> {
    if let Some(category) = Category::from_label(label) {
        return Some(category);
    }
    let lowered = label.trim().to_ascii_lowercase();
    Category::ALL
        .iter()
        .map(|c| (*c, strsim::normalized_levenshtein(&lowered, &c.as_str().to_ascii_lowercase())))
        .filter(|(_, similarity)| *similarity >= LABEL_SIMILARITY)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}

/// Page-annotated document text for the secondary reviewer
pub fn secondary_document_text(pages: &BTreeMap<u32, String>) -> String {
    let text = pages
        .iter()
        .map(|(page, text)| format!("=== Page {} ===\n{}", page, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");
    text.chars().take(SECONDARY_TEXT_CHARS).collect()
}

const CONCERN_WORDS: [&str; 7] = ["unsafe", "not safe", "concern", "risk", "harm", "violen", "explicit"];

/// Words that cancel a concern word when they precede it closely
const NEGATORS: [&str; 10] = [
    "no", "not", "none", "without", "zero", "free", "low", "minimal", "negligible", "little",
];

/// How many words before a concern word are checked for a negator
const NEGATION_WINDOW: usize = 3;

/// True when a content-safety note describes a concern
///
/// The safe sentinel and negated phrases ("no safety concerns", "low risk")
/// are safe. Each clause is judged on its own, so "no nudity, graphic
/// violence" still flags.
pub fn flags_concern(content_safety: &str) -> bool {
    let lowered = content_safety.trim().to_ascii_lowercase();
    if lowered.is_empty() || lowered.starts_with(&SAFE_CONTENT.to_ascii_lowercase()) {
        return false;
    }
    lowered
        .split(|c| matches!(c, '.' | ',' | ';' | ':' | '\n'))
        .any(clause_flags_concern)
}

fn clause_flags_concern(clause: &str) -> bool {
    CONCERN_WORDS.iter().any(|word| {
        clause
            .match_indices(word)
            .any(|(at, _)| !is_negated(&clause[..at]))
    })
}

fn is_negated(before: &str) -> bool {
    before
        .split_whitespace()
        .rev()
        .take(NEGATION_WINDOW)
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphabetic()))
        .any(|w| NEGATORS.contains(&w))
}

/// Agreement score and disagreement list
#[derive(Debug, Clone, PartialEq)]
pub struct Agreement {
    pub score: f64,
    pub disagreements: Vec<String>,
}

fn cited_pages(citations: &[Citation]) -> BTreeSet<u32> {
    citations.iter().map(|c| c.page).collect()
}

fn jaccard(a: &BTreeSet<u32>, b: &BTreeSet<u32>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Weighted agreement between the primary decision and the secondary verdict
pub fn compute_agreement(primary: &Decision, secondary: &SecondaryVerdict) -> Agreement {
    let distance = primary
        .final_category
        .severity()
        .abs_diff(secondary.label.severity()) as f64;
    let label_score = 1.0 - distance / 3.0;

    let confidence_gap = (primary.confidence - secondary.confidence).abs();
    let confidence_score = 1.0 - confidence_gap;

    let primary_concern = flags_concern(&primary.content_safety);
    let secondary_concern = flags_concern(&secondary.content_safety);
    let safety_score = if primary_concern == secondary_concern { 1.0 } else { 0.0 };

    let primary_pages = cited_pages(&primary.citations);
    let secondary_pages = cited_pages(&secondary.citations);
    let overlap = jaccard(&primary_pages, &secondary_pages);

    let score = LABEL_WEIGHT * label_score
        + CONFIDENCE_WEIGHT * confidence_score
        + SAFETY_WEIGHT * safety_score
        + CITATION_WEIGHT * overlap;

    let mut disagreements = Vec::new();
    if primary.final_category != secondary.label {
        disagreements.push(format!(
            "final_category: {} vs {}",
            primary.final_category, secondary.label
        ));
    }
    if confidence_gap > CONFIDENCE_GAP {
        disagreements.push(format!(
            "confidence: {:.2} vs {:.2}",
            primary.confidence, secondary.confidence
        ));
    }
    if primary_concern != secondary_concern {
        disagreements.push(format!(
            "content_safety: {} vs {}",
            primary.content_safety, secondary.content_safety
        ));
    }
    if overlap < CITATION_OVERLAP {
        disagreements.push(format!(
            "citations: pages {:?} vs {:?}",
            primary_pages, secondary_pages
        ));
    }

    Agreement {
        score: score.clamp(0.0, 1.0),
        disagreements,
    }
}

/// Merge the secondary verdict into the primary decision
///
/// Equal labels stand; otherwise the more severe label wins. Confidence is
/// blended by `primary_weight`, tags unioned, citations appended.
pub fn merge(primary: &Decision, secondary: &SecondaryVerdict, primary_weight: f64) -> Decision {
    let final_category = primary.final_category.max_severity(secondary.label);

    let confidence = (primary_weight * primary.confidence
        + (1.0 - primary_weight) * secondary.confidence)
        .clamp(0.0, 1.0);

    let mut secondary_tags = primary.secondary_tags.clone();
    for tag in &secondary.critical_info {
        if !secondary_tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            secondary_tags.push(tag.clone());
        }
    }

    let mut citations = primary.citations.clone();
    citations.extend(secondary.citations.iter().cloned());

    let mut explanation = primary.explanation.clone();
    if !secondary.rationale.trim().is_empty() {
        if !explanation.is_empty() {
            explanation.push('\n');
        }
        explanation.push_str(&format!("Secondary review: {}", secondary.rationale.trim()));
    }

    let content_safety = if !flags_concern(&primary.content_safety)
        && flags_concern(&secondary.content_safety)
    {
        secondary.content_safety.clone()
    } else {
        primary.content_safety.clone()
    };

    Decision {
        final_category,
        secondary_tags,
        confidence,
        citations,
        explanation,
        content_safety,
        is_fallback: primary.is_fallback,
    }
}
