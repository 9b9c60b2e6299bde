//! Final-decision parsing and the deterministic fallback ladder

use serde_json::Value;

use crate::models::{Category, Citation, DetectorSignals};

/// Confidence used when the model omits one, and for every fallback decision
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

pub const SAFE_CONTENT: &str = "Content is safe for kids";
pub const UNSAFE_CONTENT: &str = "Unsafe content detected";

/// Primary model verdict (or its fallback stand-in)
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub final_category: Category,
    pub secondary_tags: Vec<String>,
    pub confidence: f64,
    pub citations: Vec<Citation>,
    pub explanation: String,
    pub content_safety: String,
    /// True when the detectors decided instead of the model
    pub is_fallback: bool,
}

/// Severity ladder over detector signals
///
/// unsafe → Unsafe, PII → Highly Sensitive, internal markers → Confidential,
/// otherwise Public.
pub fn fallback_decision(signals: &DetectorSignals) -> Decision {
    let (category, tags, explanation) = if signals.has_unsafe_pattern {
        (Category::Unsafe, vec!["Safety-Risk"], "Unsafe keywords detected.")
    } else if signals.has_pii {
        (Category::HighlySensitive, vec!["PII"], "PII patterns detected.")
    } else if signals.has_internal_markers {
        (Category::Confidential, vec!["Internal"], "Internal markers detected.")
    } else {
        (Category::Public, vec![], "No sensitive markers found.")
    };

    let hits = if signals.pii_hits.is_empty() {
        &signals.unsafe_hits
    } else {
        &signals.pii_hits
    };

    Decision {
        final_category: category,
        secondary_tags: tags.into_iter().map(String::from).collect(),
        confidence: DEFAULT_CONFIDENCE,
        citations: hits.iter().take(3).cloned().collect(),
        explanation: explanation.to_string(),
        content_safety: default_content_safety(category).to_string(),
        is_fallback: true,
    }
}

pub fn default_content_safety(category: Category) -> &'static str {
    if category == Category::Unsafe {
        UNSAFE_CONTENT
    } else {
        SAFE_CONTENT
    }
}

/// Parse the `final_decision` node output
///
/// Returns None when the output is a mock placeholder, lacks a valid
/// `final_category`, or carries malformed fields.
pub fn parse_final_decision(output: &Value) -> Option<Decision> {
    let obj = output.as_object()?;
    if obj.get("mock").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }

    let final_category = Category::from_label(obj.get("final_category")?.as_str()?)?;

    let secondary_tags = match obj.get("secondary_tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|t| t.as_str().map(String::from))
            .collect::<Option<Vec<_>>>()?,
        Some(_) => return None,
    };

    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) => DEFAULT_CONFIDENCE,
        Some(value) => number(value)?,
    }
    .clamp(0.0, 1.0);

    let citations = match obj.get("citations") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(parse_citation)
            .collect::<Option<Vec<_>>>()?,
        Some(_) => return None,
    };

    let explanation = obj
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let content_safety = obj
        .get("content_safety")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
        .unwrap_or_else(|| default_content_safety(final_category).to_string());

    Some(Decision {
        final_category,
        secondary_tags,
        confidence,
        citations,
        explanation,
        content_safety,
        is_fallback: false,
    })
}

/// Model verdict when parseable, otherwise the fallback ladder
pub fn decide(output: &Value, signals: &DetectorSignals) -> Decision {
    parse_final_decision(output).unwrap_or_else(|| {
        tracing::debug!("Final decision unusable, applying fallback ladder");
        fallback_decision(signals)
    })
}

fn parse_citation(value: &Value) -> Option<Citation> {
    let page = number(value.get("page")?)?;
    if page < 1.0 {
        return None;
    }
    let snippet = value.get("snippet")?.as_str()?;
    Some(Citation::new(page as u32, snippet))
}

/// Numbers may arrive as JSON numbers or numeric strings
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
