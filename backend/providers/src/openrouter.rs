use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pantry_config::defaults::OPENROUTER_BASE_URL;
use pantry_core::{Completion, CompletionRequest, ServiceError, TextCompleter};

use crate::http::{decode_error, error_from_response, transport_error};

/// OpenRouter.ai provider (OpenAI-compatible chat completions).
pub struct OpenRouterCompleter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterCompleter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
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
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    /// OpenRouter reports some upstream failures with a 200 and an error body.
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

/// Tool-call and refusal replies carry `"content": null`.
#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<i32>,
    #[serde(default)]
    message: String,
}

pub(crate) fn chat_messages(request: &CompletionRequest) -> Vec<(String, String)> {
    let mut messages = Vec::new();
    if !request.system_prompt.is_empty() {
        messages.push(("system".to_string(), request.system_prompt.clone()));
    }
    messages.push(("user".to_string(), request.prompt.clone()));
    messages
}

fn first_content(choices: Vec<Choice>) -> Result<String, ServiceError> {
    let choice = choices
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::Unavailable("OpenRouter returned no choices".into()))?;
    choice.message.content.ok_or_else(|| {
        ServiceError::Unavailable(format!(
            "OpenRouter returned no text content (finish_reason: {})",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })
}

#[async_trait]
impl TextCompleter for OpenRouterCompleter {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: self.model.clone(),
            messages: chat_messages(request)
                .into_iter()
                .map(|(role, content)| ChatMessage { role, content })
                .collect(),
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!(model = %self.model, "Sending request to OpenRouter");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let chat_response: ChatResponse = response.json().await.map_err(decode_error)?;

        if let Some(error) = chat_response.error {
            return Err(match error.code {
                Some(status @ 400..=599) => ServiceError::Http {
                    status: status as u16,
                    body: error.message,
                },
                code => ServiceError::Reported {
                    code,
                    message: error.message,
                },
            });
        }

        let content = first_content(chat_response.choices)?;

        let tokens_used = chat_response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);

        Ok(Completion {
            content,
            provider: "openrouter".to_string(),
            model: self.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
