/// Vision client for OpenAI-compatible chat completion endpoints.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use flexscan_core::{FlexscanError, VisionClient, VisionRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiVision {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiVision {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Shape the chat payload: optional system message, then one user message
/// with the prompt and the inlined image.
fn build_messages(request: &VisionRequest) -> Vec<serde_json::Value> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system_prompt {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({
        "role": "user",
        "content": [
            { "type": "text", "text": request.prompt },
            { "type": "image_url",
              "image_url": { "url": format!("data:{};base64,{}", request.mime_type, request.image_b64) } }
        ]
    }));
    messages
}

#[async_trait]
impl VisionClient for OpenAiVision {
    fn name(&self) -> &str {
        "openai"
    }

    async fn query(&self, request: &VisionRequest) -> Result<String, FlexscanError> {
        let vision_error = |message: String| FlexscanError::Vision {
            model: request.model.clone(),
            message,
        };

        let body = ChatRequest {
            model: request.model.clone(),
            messages: build_messages(request),
            max_tokens: request.max_tokens,
            temperature: 0.0,
        };

        debug!(model = %request.model, "Sending vision request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| vision_error(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(vision_error(format!("{status}: {error_body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| vision_error(format!("malformed response: {e}")))?;

        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
