use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pantry_config::defaults::OLLAMA_BASE_URL;
use pantry_core::{Completion, CompletionRequest, ServiceError, TextCompleter};

use crate::http::{decode_error, error_from_response, transport_error};
use crate::openrouter::chat_messages;

/// Ollama local LLM provider.
pub struct OllamaCompleter {
    client: Client,
    model: String,
    base_url: String,
}

impl OllamaCompleter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: strip_provider_prefix(&model.into()),
            base_url: OLLAMA_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// "openai/llama3.1" -> "llama3.1"
fn strip_provider_prefix(model: &str) -> String {
    model.rsplit('/').next().unwrap_or(model).to_string()
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize, Deserialize)]
struct OllamaChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
    eval_count: Option<u64>,
    prompt_eval_count: Option<u64>,
}

#[async_trait]
impl TextCompleter for OllamaCompleter {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        let start = Instant::now();

        let body = OllamaChatRequest {
            model: self.model.clone(),
            messages: chat_messages(request)
                .into_iter()
                .map(|(role, content)| OllamaChatMessage { role, content })
                .collect(),
            stream: false,
            format: request.json_output.then_some("json"),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!(model = %self.model, "Sending request to Ollama");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let chat_response: OllamaChatResponse = response.json().await.map_err(decode_error)?;

        let tokens_used = chat_response.eval_count.unwrap_or(0)
            + chat_response.prompt_eval_count.unwrap_or(0);

        Ok(Completion {
            content: chat_response.message.content,
            provider: "ollama".to_string(),
            model: self.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_from_model() {
        assert_eq!(strip_provider_prefix("openai/llama3.1"), "llama3.1");
        assert_eq!(strip_provider_prefix("qwen2.5"), "qwen2.5");
    }

    #[test]
    fn json_mode_sets_format() {
        let body = OllamaChatRequest {
            model: "llama3.1".into(),
            messages: vec![],
            stream: false,
            format: Some("json"),
            options: OllamaOptions { temperature: 0.0, num_predict: 16 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["options"]["num_predict"], 16);
    }
}
