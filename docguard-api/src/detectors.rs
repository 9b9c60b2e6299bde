//! Keyword and regex detectors
//!
//! Cheap local signals that run before any model call: PII patterns,
//! internal/confidential markers and unsafe keywords. Their output seeds the
//! prompts and drives the fallback decision when the models are unavailable.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use once_cell::sync::Lazy;

use crate::models::{Citation, DetectorSignals};
use crate::policy::DetectorRules;

/// Characters of page text quoted in a detector citation
const SNIPPET_CHARS: usize = 200;

static SSN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid SSN regex"));

static CARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]*?){13,16}\b").expect("valid card regex"));

/// Compiled detector set for one policy
#[derive(Debug, Clone)]
pub struct Detectors {
    internal: Vec<Regex>,
    unsafe_keywords: Vec<Regex>,
}

impl Detectors {
    /// Compile whole-word, case-insensitive matchers for the policy keyword lists
    pub fn new(rules: &DetectorRules) -> Result<Self, regex::Error> {
        Ok(Self {
            internal: compile_keywords(&rules.internal_markers)?,
            unsafe_keywords: compile_keywords(&rules.unsafe_keywords)?,
        })
    }

    /// Run every detector over every page
    pub fn run(&self, pages: &BTreeMap<u32, String>) -> DetectorSignals {
        let mut signals = DetectorSignals::default();

        for (&page, text) in pages {
            if SSN_PATTERN.is_match(text) || CARD_PATTERN.is_match(text) {
                signals.has_pii = true;
                signals
                    .pii_hits
                    .push(Citation::new(page, page_snippet(text)).with_source("detector_pii"));
            }

            if self.internal.iter().any(|rx| rx.is_match(text)) {
                signals.has_internal_markers = true;
                signals.notes.push(format!("Internal marker on page {}", page));
            }

            if self.unsafe_keywords.iter().any(|rx| rx.is_match(text)) {
                signals.has_unsafe_pattern = true;
                signals
                    .unsafe_hits
                    .push(Citation::new(page, page_snippet(text)).with_source("detector_unsafe"));
            }
        }

        tracing::debug!(
            has_pii = signals.has_pii,
            has_unsafe = signals.has_unsafe_pattern,
            has_internal = signals.has_internal_markers,
            "Detectors finished"
        );
        signals
    }
}

fn compile_keywords(words: &[String]) -> Result<Vec<Regex>, regex::Error> {
    words
        .iter()
        .map(|word| word.trim())
        .filter(|word| !word.is_empty())
        .map(|word| {
            RegexBuilder::new(&format!(r"\b{}\b", regex::escape(word)))
                .case_insensitive(true)
                .build()
        })
        .collect()
}

/// First 200 characters of the page with newlines flattened
fn page_snippet(text: &str) -> String {
    text.chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
        entries.iter().map(|(p, t)| (*p, t.to_string())).collect()
    }

    fn detectors() -> Detectors {
        Detectors::new(&DetectorRules::default()).unwrap()
    }

    #[test]
    fn ssn_is_pii() {
        let signals = detectors().run(&pages(&[(1, "Employee SSN: 123-45-6789\nThanks")]));
        assert!(signals.has_pii);
        assert_eq!(signals.pii_hits.len(), 1);
        assert_eq!(signals.pii_hits[0].page, 1);
        assert_eq!(signals.pii_hits[0].source.as_deref(), Some("detector_pii"));
        assert!(!signals.pii_hits[0].snippet.contains('\n'));
    }

    #[test]
    fn card_number_with_separators_is_pii() {
        let signals = detectors().run(&pages(&[(2, "Card 4111 1111 1111 1111 exp 09/27")]));
        assert!(signals.has_pii);
        assert_eq!(signals.pii_hits[0].page, 2);
    }

    #[test]
    fn short_numbers_are_not_pii() {
        let signals = detectors().run(&pages(&[(1, "Order 12345 shipped on 2024-01-02")]));
        assert!(!signals.has_pii);
    }

    #[test]
    fn internal_markers_match_whole_words_only() {
        let signals = detectors().run(&pages(&[
            (1, "This memo is COMPANY CONFIDENTIAL."),
            (2, "The agenda covers standard items."),
        ]));
        assert!(signals.has_internal_markers);
        assert_eq!(signals.notes, vec!["Internal marker on page 1".to_string()]);

        // "nda" must not fire inside "agenda" or "Monday"
        let signals = detectors().run(&pages(&[(1, "Monday agenda")]));
        assert!(!signals.has_internal_markers);
    }

    #[test]
    fn unsafe_keywords_are_cited() {
        let signals = detectors().run(&pages(&[(3, "Learn how to make a bomb at home")]));
        assert!(signals.has_unsafe_pattern);
        assert_eq!(signals.unsafe_hits[0].page, 3);
        assert_eq!(signals.unsafe_hits[0].source.as_deref(), Some("detector_unsafe"));
    }

    #[test]
    fn clean_document_has_no_signals() {
        let signals = detectors().run(&pages(&[(1, "The quarterly newsletter is out.")]));
        assert_eq!(signals, DetectorSignals::default());
    }

    #[test]
    fn snippet_is_char_bounded() {
        let text = "é".repeat(500);
        assert_eq!(page_snippet(&text).chars().count(), 200);
    }

    #[test]
    fn custom_rules_are_honoured() {
        let rules = DetectorRules {
            internal_markers: vec!["project falcon".into()],
            unsafe_keywords: vec![],
        };
        let detectors = Detectors::new(&rules).unwrap();
        let signals = detectors.run(&pages(&[(1, "Status of Project Falcon")]));
        assert!(signals.has_internal_markers);
        let signals = detectors.run(&pages(&[(1, "this is confidential")]));
        assert!(!signals.has_internal_markers);
    }
}
