//! Clients for the external services the receipt pipeline depends on.
//!
//! Every client implements one of the `pantry-core` capabilities, so the
//! pipeline never sees a concrete provider type.

pub mod gemini;
pub mod google_vision;
mod http;
pub mod mock;
pub mod ollama;
pub mod openrouter;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use pantry_config::{LlmConfig, LlmProviderKind, OcrConfig, OcrProviderKind};
use pantry_core::{TextCompleter, TextExtractor};

pub use gemini::GeminiCompleter;
pub use google_vision::GoogleVisionExtractor;
pub use mock::{MockCompleter, MockExtractor};
pub use ollama::OllamaCompleter;
pub use openrouter::OpenRouterCompleter;

/// Build the OCR client described by the config.
pub fn build_extractor(config: &OcrConfig) -> Result<Arc<dyn TextExtractor>> {
    let extractor: Arc<dyn TextExtractor> = match config.provider {
        OcrProviderKind::GoogleVision => {
            let api_key = config
                .api_key
                .clone()
                .context("ocr.apiKey is required for google_vision")?;
            let mut client = GoogleVisionExtractor::new(api_key);
            if let Some(endpoint) = &config.endpoint {
                client = client.with_endpoint(endpoint);
            }
            Arc::new(client)
        }
        OcrProviderKind::Mock => Arc::new(MockExtractor::sample_receipt()),
    };
    info!(provider = extractor.name(), "Registered OCR provider");
    Ok(extractor)
}

/// Build the language-model client described by the config.
pub fn build_completer(config: &LlmConfig) -> Result<Arc<dyn TextCompleter>> {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| pantry_config::defaults::default_model(config.provider).to_string());

    let completer: Arc<dyn TextCompleter> = match config.provider {
        LlmProviderKind::Gemini => {
            let api_key = config.api_key.clone().context("llm.apiKey is required for gemini")?;
            let mut client = GeminiCompleter::new(api_key, &model);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        LlmProviderKind::OpenRouter => {
            let api_key = config
                .api_key
                .clone()
                .context("llm.apiKey is required for openrouter")?;
            let mut client = OpenRouterCompleter::new(api_key, &model);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        LlmProviderKind::Ollama => {
            let mut client = OllamaCompleter::new(&model);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        LlmProviderKind::Mock => Arc::new(MockCompleter::canned()),
    };
    info!(provider = completer.name(), model = %model, "Registered LLM provider");
    Ok(completer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_mock_providers() {
        let ocr = OcrConfig {
            provider: OcrProviderKind::Mock,
            ..Default::default()
        };
        let llm = LlmConfig {
            provider: LlmProviderKind::Mock,
            ..Default::default()
        };
        assert_eq!(build_extractor(&ocr).unwrap().name(), "mock");
        assert_eq!(build_completer(&llm).unwrap().name(), "mock");
    }

    #[test]
    fn keyed_providers_need_keys() {
        let llm = LlmConfig {
            provider: LlmProviderKind::OpenRouter,
            ..Default::default()
        };
        let err = build_completer(&llm).err().unwrap().to_string();
        assert!(err.contains("llm.apiKey"));
        assert!(build_extractor(&OcrConfig::default()).is_err());
    }

    #[test]
    fn ollama_builds_without_key() {
        let llm = LlmConfig {
            provider: LlmProviderKind::Ollama,
            base_url: Some("http://gpu-box:11434".into()),
            ..Default::default()
        };
        assert_eq!(build_completer(&llm).unwrap().name(), "ollama");
    }
}
