//! Primary multi-prompt pipeline
//!
//! precheck → pii_scan (PII only) → unsafe_scan → confidentiality_scan →
//! final_decision. A failing node never aborts the run: it is replaced by a
//! mock placeholder and its name recorded in `prompt_errors`.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::llm::{ChatBackend, ChatMessage, Role};
use crate::models::{DetectorSignals, ExtractedImage};
use crate::policy::Policy;

/// Page text budget per prompt
pub const TRUNCATE_CHARS: usize = 1200;

/// Outputs of every primary node
#[derive(Debug, Clone, Default)]
pub struct PrimaryRun {
    pub precheck: Value,
    pub pii_scan: Option<Value>,
    pub unsafe_scan: Value,
    pub confidentiality_scan: Value,
    pub final_decision: Value,
    /// Page summaries from precheck, when it produced any
    pub summaries: BTreeMap<u32, String>,
    /// Names of nodes that failed
    pub prompt_errors: Vec<String>,
}

impl PrimaryRun {
    /// Node outputs as one JSON object for `primary_analysis`
    pub fn analysis(&self) -> Value {
        json!({
            "precheck": self.precheck,
            "pii_scan": self.pii_scan,
            "unsafe_scan": self.unsafe_scan,
            "confidentiality_scan": self.confidentiality_scan,
            "final_decision": self.final_decision,
        })
    }
}

/// Trim each page and cut it to the prompt budget at a word boundary
pub fn prepare_pages(pages: &BTreeMap<u32, String>) -> BTreeMap<u32, String> {
    pages
        .iter()
        .map(|(&page, text)| (page, truncate_page(text.trim())))
        .collect()
}

fn truncate_page(text: &str) -> String {
    if text.chars().count() <= TRUNCATE_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(TRUNCATE_CHARS).collect();
    let head = match cut.rfind(' ') {
        Some(idx) => &cut[..idx],
        None => cut.as_str(),
    };
    format!("{} …", head)
}

/// Placeholder standing in for a failed node
pub fn mock_output(node: &str, error: &str) -> Value {
    json!({"mock": true, "error": error, "prompt_node": node})
}

pub fn is_mock(output: &Value) -> bool {
    output.get("mock").and_then(Value::as_bool).unwrap_or(false)
}

/// Collect `[{page, summary}]` entries from the precheck output
pub fn summary_pages(precheck: &Value) -> BTreeMap<u32, String> {
    let Some(entries) = precheck.as_array() else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let page = entry.get("page")?.as_u64().filter(|p| *p > 0)?;
            let summary = entry.get("summary")?.as_str()?.trim();
            if summary.is_empty() {
                return None;
            }
            Some((page as u32, summary.to_string()))
        })
        .collect()
}

struct NodeRunner<'a> {
    backend: &'a dyn ChatBackend,
    policy: &'a Policy,
    pages: &'a BTreeMap<u32, String>,
    page_count: usize,
}

impl NodeRunner<'_> {
    async fn run(
        &self,
        node: &str,
        override_pages: Option<&BTreeMap<u32, String>>,
        extra: Value,
        images: &[ExtractedImage],
    ) -> Value {
        let prompt = match self.policy.get_prompt(node) {
            Ok(prompt) => prompt,
            Err(e) => return mock_output(node, &e.to_string()),
        };

        let payload = json!({
            "pages": prepare_pages(override_pages.unwrap_or(self.pages)),
            "page_count": self.page_count,
            "extra": extra,
        });
        let messages = [
            ChatMessage::new(Role::parse(&prompt.role), prompt.content.clone()),
            ChatMessage::user(payload.to_string()),
        ];

        match self.backend.complete_json(&messages, images).await {
            Ok(output) => {
                debug!(node, backend = self.backend.name(), "Prompt node completed");
                output
            }
            Err(e) => {
                warn!(node, error = %e, "Prompt node failed");
                mock_output(node, &e.to_string())
            }
        }
    }
}

/// Run every primary node in order
///
/// Images ride along with the final decision only.
pub async fn run_primary(
    backend: &dyn ChatBackend,
    policy: &Policy,
    pages: &BTreeMap<u32, String>,
    signals: &DetectorSignals,
    images: &[ExtractedImage],
) -> PrimaryRun {
    let runner = NodeRunner {
        backend,
        policy,
        pages,
        page_count: pages.len(),
    };
    let mut run = PrimaryRun::default();
    let detectors = serde_json::to_value(signals).unwrap_or(Value::Null);

    run.precheck = runner.run("precheck", None, json!({}), &[]).await;
    run.summaries = summary_pages(&run.precheck);
    let summaries = (!run.summaries.is_empty()).then_some(&run.summaries);

    if signals.has_pii {
        run.pii_scan = Some(
            runner
                .run("pii_scan", summaries, json!({"detectors": detectors}), &[])
                .await,
        );
    }

    run.unsafe_scan = runner
        .run("unsafe_scan", summaries, json!({"detectors": detectors}), &[])
        .await;

    let mut extra = Map::new();
    extra.insert("detectors".into(), detectors.clone());
    extra.insert("precheck".into(), run.precheck.clone());
    extra.insert("pii_scan".into(), run.pii_scan.clone().unwrap_or(Value::Null));
    extra.insert("unsafe_scan".into(), run.unsafe_scan.clone());
    run.confidentiality_scan = runner
        .run("confidentiality_scan", summaries, Value::Object(extra.clone()), &[])
        .await;

    extra.insert("confidentiality_scan".into(), run.confidentiality_scan.clone());
    run.final_decision = runner
        .run("final_decision", summaries, Value::Object(extra), images)
        .await;

    let nodes = [
        ("precheck", Some(&run.precheck)),
        ("pii_scan", run.pii_scan.as_ref()),
        ("unsafe_scan", Some(&run.unsafe_scan)),
        ("confidentiality_scan", Some(&run.confidentiality_scan)),
        ("final_decision", Some(&run.final_decision)),
    ];
    run.prompt_errors = nodes
        .iter()
        .filter(|(_, output)| output.map(is_mock).unwrap_or(false))
        .map(|(name, _)| name.to_string())
        .collect();

    run
}
