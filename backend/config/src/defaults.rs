//! Config defaults: constants for every tunable, plus provider-dependent
//! values that can only be filled in once the provider is known.

use crate::schema::{LlmProviderKind, OcrProviderKind, PantryConfig};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

pub const DEFAULT_MAX_CORRECTION_ATTEMPTS: u32 = 2;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_RETRY_BACKOFF_FACTOR: f64 = 2.0;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const GOOGLE_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default model id for a provider.
pub fn default_model(provider: LlmProviderKind) -> &'static str {
    match provider {
        LlmProviderKind::Gemini => "gemini-2.0-flash",
        LlmProviderKind::OpenRouter => "google/gemini-2.0-flash-001",
        LlmProviderKind::Ollama => "llama3.1",
        LlmProviderKind::Mock => "mock",
    }
}

/// Default base URL for a provider; `None` for the mock.
pub fn default_base_url(provider: LlmProviderKind) -> Option<&'static str> {
    match provider {
        LlmProviderKind::Gemini => Some(GEMINI_BASE_URL),
        LlmProviderKind::OpenRouter => Some(OPENROUTER_BASE_URL),
        LlmProviderKind::Ollama => Some(OLLAMA_BASE_URL),
        LlmProviderKind::Mock => None,
    }
}

/// Apply all provider-dependent defaults to a freshly loaded config.
pub fn apply_all_defaults(config: PantryConfig) -> PantryConfig {
    let config = apply_ocr_defaults(config);
    apply_llm_defaults(config)
}

fn apply_ocr_defaults(mut config: PantryConfig) -> PantryConfig {
    if config.ocr.endpoint.is_none() && config.ocr.provider == OcrProviderKind::GoogleVision {
        config.ocr.endpoint = Some(GOOGLE_VISION_ENDPOINT.to_string());
    }
    config
}

fn apply_llm_defaults(mut config: PantryConfig) -> PantryConfig {
    let llm = &mut config.llm;
    if llm.model.is_none() {
        llm.model = Some(default_model(llm.provider).to_string());
    }
    if llm.base_url.is_none() {
        llm.base_url = default_base_url(llm.provider).map(str::to_string);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_provider_defaults() {
        let config = apply_all_defaults(PantryConfig::default());
        assert_eq!(config.ocr.endpoint.as_deref(), Some(GOOGLE_VISION_ENDPOINT));
        assert_eq!(config.llm.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.llm.base_url.as_deref(), Some(GEMINI_BASE_URL));
    }

    #[test]
    fn keeps_explicit_values() {
        let mut config = PantryConfig::default();
        config.llm.provider = LlmProviderKind::Ollama;
        config.llm.base_url = Some("http://gpu-box:11434".to_string());
        let config = apply_all_defaults(config);
        assert_eq!(config.llm.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.llm.model.as_deref(), Some("llama3.1"));
    }

    #[test]
    fn mock_has_no_base_url() {
        let mut config = PantryConfig::default();
        config.llm.provider = LlmProviderKind::Mock;
        config.ocr.provider = OcrProviderKind::Mock;
        let config = apply_all_defaults(config);
        assert!(config.llm.base_url.is_none());
        assert!(config.ocr.endpoint.is_none());
    }
}
