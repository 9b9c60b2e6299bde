//! OpenAI-compatible chat completions backend (secondary reviewer)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{http_client, parse_json_reply, ChatBackend, ChatMessage, LlmError};
use crate::config::LlmSettings;
use crate::models::ExtractedImage;

pub struct OpenAiBackend {
    settings: LlmSettings,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<RequestMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl OpenAiBackend {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        Ok(Self {
            settings,
            client: http_client()?,
        })
    }

    fn build_request(&self, messages: &[ChatMessage], images: &[ExtractedImage]) -> ChatRequest {
        let mut request_messages: Vec<RequestMessage> = messages
            .iter()
            .map(|m| RequestMessage {
                role: m.role.as_str(),
                content: MessageContent::Text(m.content.clone()),
            })
            .collect();

        if !images.is_empty() {
            let parts = images
                .iter()
                .map(|img| ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", img.mime_type(), img.data),
                    },
                })
                .collect::<Vec<_>>();
            let mut content = vec![ContentPart::Text {
                text: "Attached images from the document.".to_string(),
            }];
            content.extend(parts);
            request_messages.push(RequestMessage {
                role: "user",
                content: MessageContent::Parts(content),
            });
        }

        ChatRequest {
            model: self.settings.model.clone(),
            messages: request_messages,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            max_tokens: self.settings.max_output_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
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
            .ok_or_else(|| LlmError::NotConfigured("SECONDARY_LLM_API_KEY".to_string()))?;

        let request = self.build_request(messages, images);
        debug!(model = %self.settings.model, "Calling secondary model");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Option<ChatResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content = body
            .and_then(|b| b.choices)
            .and_then(|choices| choices.into_iter().next())
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("response has no message content".to_string()))?;

        let mut value = parse_json_reply(&content)?;
        if let Value::Object(map) = &mut value {
            map.insert("model".to_string(), Value::String(self.settings.model.clone()));
        }
        Ok(value)
    }
}
