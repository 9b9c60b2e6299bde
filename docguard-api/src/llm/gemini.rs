//! Google Gemini `generateContent` backend (primary classifier)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{http_client, parse_json_reply, ChatBackend, ChatMessage, LlmError, Role};
use crate::config::LlmSettings;
use crate::models::ExtractedImage;

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GeminiBackend {
    settings: LlmSettings,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

impl GeminiBackend {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        Ok(Self {
            settings,
            client: http_client()?,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.settings.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.settings.base_url, model)
    }

    fn build_request(&self, messages: &[ChatMessage], images: &[ExtractedImage]) -> GeminiRequest {
        let mut contents = to_contents(messages);
        if !images.is_empty() {
            let image_parts = images.iter().map(|img| GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: img.mime_type().to_string(),
                    data: img.data.clone(),
                },
            });
            match contents.last_mut() {
                Some(last) if last.role == "user" => last.parts.extend(image_parts),
                _ => contents.push(GeminiContent {
                    role: "user",
                    parts: image_parts.collect(),
                }),
            }
        }

        GeminiRequest {
            contents,
            generation_config: GeminiGenerationConfig {
                temperature: self.settings.temperature,
                top_p: self.settings.top_p,
                max_output_tokens: self.settings.max_output_tokens,
                response_mime_type: "application/json",
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

/// Map chat roles onto Gemini turns, merging consecutive turns of the same role
fn to_contents(messages: &[ChatMessage]) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();
    for message in messages {
        let role = match message.role {
            Role::Assistant => "model",
            Role::System | Role::User => "user",
        };
        let part = GeminiPart::Text {
            text: message.content.clone(),
        };
        match contents.last_mut() {
            Some(last) if last.role == role => last.parts.push(part),
            _ => contents.push(GeminiContent {
                role,
                parts: vec![part],
            }),
        }
    }
    contents
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn complete_json(
        &self,
        messages: &[ChatMessage],
        images: &[ExtractedImage],
    ) -> Result<Value, LlmError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY".to_string()))?;

        let request = self.build_request(messages, images);
        debug!(model = %self.settings.model, images = images.len(), "Calling Gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: GeminiResponse = response.json().await.map_err(|e| {
            if status.is_success() {
                LlmError::Parse(e.to_string())
            } else {
                LlmError::Api {
                    status: status.as_u16(),
                    message: e.to_string(),
                }
            }
        })?;

        if let Some(error) = body.error {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: "request failed".to_string(),
            });
        }

        let text: String = body
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LlmError::Parse("Gemini returned no text".to_string()));
        }

        parse_json_reply(&text)
    }
}
