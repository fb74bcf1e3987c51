use async_trait::async_trait;

use crate::error::ServiceError;
use crate::types::Vertex;

/// One text entry as reported by an OCR service, before normalization.
///
/// By convention the first entry of a response spans the whole image and the
/// rest are individual tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTextEntry {
    pub description: String,
    pub confidence: Option<f32>,
    pub vertices: Vec<Vertex>,
}

impl RawTextEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_vertices(mut self, vertices: Vec<Vertex>) -> Self {
        self.vertices = vertices;
        self
    }
}

/// Capability: read text out of an image.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Provider name (e.g., "google-vision", "mock").
    fn name(&self) -> &str;

    /// Run text detection over encoded image bytes.
    async fn detect_text(&self, image: &[u8]) -> Result<Vec<RawTextEntry>, ServiceError>;
}

/// Capability: complete a natural-language prompt.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Provider name (e.g., "gemini", "openrouter", "ollama").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError>;
}

/// Request to a language-model provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider for a JSON response body when it supports that.
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: String::new(),
            prompt: prompt.into(),
            max_tokens: 2048,
            temperature: 0.2,
            json_output: false,
        }
    }
}

/// Response from a language-model provider.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
