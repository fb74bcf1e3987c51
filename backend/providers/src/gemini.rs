use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pantry_config::defaults::GEMINI_BASE_URL;
use pantry_core::{Completion, CompletionRequest, ServiceError, TextCompleter};

use crate::http::{decode_error, error_from_response, transport_error};

/// Google Gemini (`generateContent`) provider.
pub struct GeminiCompleter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCompleter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn text_part(text: &str) -> Content {
    Content {
        role: None,
        parts: vec![Part {
            text: text.to_string(),
        }],
    }
}

/// Concatenate the text parts of the first candidate.
fn content_from_response(response: &GenerateResponse) -> Result<String, ServiceError> {
    let Some(candidate) = response.candidates.first() else {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ServiceError::Unavailable(format!("Gemini returned nothing: {reason}")));
    };

    let text: String = candidate
        .content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect();

    if text.is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("UNKNOWN");
        return Err(ServiceError::Unavailable(format!(
            "Gemini returned an empty candidate (finishReason={reason})"
        )));
    }
    Ok(text)
}

#[async_trait]
impl TextCompleter for GeminiCompleter {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        let start = Instant::now();

        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                ..text_part(&request.prompt)
            }],
            system_instruction: (!request.system_prompt.is_empty())
                .then(|| text_part(&request.system_prompt)),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: request.json_output.then_some("application/json"),
            },
        };

        debug!(model = %self.model, "Sending request to Gemini");

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let generated: GenerateResponse = response.json().await.map_err(decode_error)?;
        let content = content_from_response(&generated)?;

        let tokens_used = generated
            .usage_metadata
            .and_then(|u| u.total_token_count)
            .unwrap_or(0);

        Ok(Completion {
            content,
            provider: "gemini".to_string(),
            model: self.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerateResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn joins_candidate_parts() {
        let response = parse(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"store_name\":" }, { "text": "\"Aldi\"}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 42 }
        }));
        assert_eq!(content_from_response(&response).unwrap(), "{\"store_name\":\"Aldi\"}");
    }

    #[test]
    fn blocked_prompt_is_unavailable() {
        let response = parse(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        let err = content_from_response(&response).unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let response = parse(json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
        }));
        let err = content_from_response(&response).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn request_uses_json_mime_type_when_asked() {
        let body = GenerateRequest {
            contents: vec![text_part("hi")],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 64,
                response_mime_type: Some("application/json"),
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 64);
        assert!(value.get("systemInstruction").is_none());
    }
}
