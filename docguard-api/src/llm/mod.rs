//! Hosted model backends
//!
//! Both backends speak the same small interface: a list of chat messages
//! (plus optional images) in, one JSON object out.

mod gemini;
mod openai;

pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::ExtractedImage;

/// Request timeout for model calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key for this backend
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse model output: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parse a policy role name; unknown names are treated as system
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// A hosted chat model that answers in JSON
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name used in logs and result payloads
    fn name(&self) -> &str;

    /// Send the conversation and parse the reply as JSON
    async fn complete_json(
        &self,
        messages: &[ChatMessage],
        images: &[ExtractedImage],
    ) -> Result<Value, LlmError>;
}

/// HTTP client shared by both backends
pub(crate) fn http_client() -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .user_agent(concat!("docguard/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(LlmError::Network)
}

/// Parse a model reply as JSON, tolerating Markdown code fences and prose
/// around a single object
pub fn parse_json_reply(text: &str) -> Result<Value, LlmError> {
    let trimmed = strip_fences(text.trim());
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    let preview: String = trimmed.chars().take(120).collect();
    Err(LlmError::Parse(format!("reply is not JSON: {}", preview)))
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line (```json)
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
