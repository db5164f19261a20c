//! OpenAI-compatible chat completions backend.
//!
//! Works with OpenAI's API and any endpoint that speaks the same protocol
//! (Azure OpenAI, GitHub Models, local gateways).

use async_trait::async_trait;
use chatter_core::{
    context::{ApiMessage, ModelRequest},
    error::ChatterError,
    traits::{ModelBackend, ModelReply},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible backend.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create from config values.
    pub fn from_config(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }
}

/// Build OpenAI-format messages (system prompt as the first message).
pub(crate) fn build_openai_messages(system: &str, api_messages: &[ApiMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(api_messages.len() + 1);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    for m in api_messages {
        messages.push(ChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        });
    }
    messages
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub model: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

/// `{"error": {"message": "...", "code": "..."}}`
#[derive(Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

/// Turn a non-success HTTP response into a backend error.
///
/// 401/403 mean the backend is not usable at all; everything else is a
/// structured failure carrying the API's message and code.
pub(crate) fn classify_error(status: reqwest::StatusCode, body: &str) -> ChatterError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return ChatterError::BackendUnavailable(format!("openai returned {status}"));
    }

    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let code = match parsed.error.code {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => parsed
                    .error
                    .error_type
                    .unwrap_or_else(|| status.as_u16().to_string()),
            };
            ChatterError::Backend {
                message: parsed.error.message,
                code,
            }
        }
        Err(_) => ChatterError::Backend {
            message: if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            },
            code: status.as_u16().to_string(),
        },
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        !self.base_url.trim().is_empty()
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ChatterError> {
        let (system, api_messages) = request.to_api_messages();
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_openai_messages(&system, &api_messages),
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("openai: POST {url} model={}", self.model);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ChatterError::BackendUnavailable(format!("openai unreachable: {e}"))
                } else {
                    ChatterError::Provider(format!("openai request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_error(status, &text));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| ChatterError::Provider(format!("openai: failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .unwrap_or_default();

        Ok(ModelReply {
            text,
            model: parsed.model,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
