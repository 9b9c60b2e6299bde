//! Classification policy: prompt library, detector keyword lists and review
//! thresholds, loaded from YAML.
//!
//! The default policy ships inside the binary; `policy_path` in the TOML
//! config (or `DOCGUARD_POLICY`) replaces it wholesale.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Policy compiled into the binary
pub const BUILTIN_POLICY: &str = include_str!("../config/policy.yaml");

/// Prompt nodes every policy must define
pub const REQUIRED_PROMPTS: [&str; 6] = [
    "precheck",
    "pii_scan",
    "unsafe_scan",
    "confidentiality_scan",
    "final_decision",
    "secondary_review",
];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse policy YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Policy is missing prompts: {0}")]
    MissingPrompts(String),

    #[error("Invalid policy: {0}")]
    Invalid(String),
}

/// One chat instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default = "default_role")]
    pub role: String,
    pub content: String,
}

fn default_role() -> String {
    "system".to_string()
}

/// Keyword lists for the local detectors (lowercase, whole-word matched)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorRules {
    #[serde(default)]
    pub internal_markers: Vec<String>,
    #[serde(default)]
    pub unsafe_keywords: Vec<String>,
}

impl Default for DetectorRules {
    fn default() -> Self {
        Self {
            internal_markers: [
                "internal use only",
                "do not distribute",
                "confidential",
                "non-disclosure",
                "nda",
                "for internal discussion",
                "company confidential",
                "proprietary",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            unsafe_keywords: [
                "child sexual",
                "exploit",
                "molest",
                "kill them all",
                "how to make a bomb",
                "join isis",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Thresholds routing results to human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewThresholds {
    /// Results below this blended confidence need review
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Dual-model agreement below this needs review
    #[serde(default = "default_agreement_threshold")]
    pub agreement_threshold: f64,
    /// Weight of the primary model in the blended confidence
    #[serde(default = "default_primary_weight")]
    pub primary_weight: f64,
}

fn default_confidence_threshold() -> f64 {
    0.75
}

fn default_agreement_threshold() -> f64 {
    0.70
}

fn default_primary_weight() -> f64 {
    0.6
}

impl Default for ReviewThresholds {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            agreement_threshold: default_agreement_threshold(),
            primary_weight: default_primary_weight(),
        }
    }
}

/// Parsed policy file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub prompts: HashMap<String, PromptTemplate>,
    #[serde(default)]
    pub detectors: DetectorRules,
    #[serde(default)]
    pub review: ReviewThresholds,
}

impl Policy {
    /// Parse and validate a policy document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let policy: Policy = serde_yaml::from_str(yaml)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy file from disk
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The policy compiled into the binary
    pub fn builtin() -> Result<Self, PolicyError> {
        Self::from_yaml_str(BUILTIN_POLICY)
    }

    /// Load `path` when given, else the builtin policy
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, PolicyError> {
        match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading classification policy");
                Self::load(path)
            }
            None => {
                tracing::info!("Using built-in classification policy");
                Self::builtin()
            }
        }
    }

    pub fn get_prompt(&self, name: &str) -> Result<&PromptTemplate, PolicyError> {
        self.prompts
            .get(name)
            .ok_or_else(|| PolicyError::UnknownPrompt(name.to_string()))
    }

    fn validate(&self) -> Result<(), PolicyError> {
        let mut missing: Vec<&str> = REQUIRED_PROMPTS
            .iter()
            .copied()
            .filter(|name| !self.prompts.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(PolicyError::MissingPrompts(missing.join(", ")));
        }

        let review = &self.review;
        for (name, value) in [
            ("confidence_threshold", review.confidence_threshold),
            ("agreement_threshold", review.agreement_threshold),
            ("primary_weight", review.primary_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::Invalid(format!(
                    "review.{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
