//! Pantry runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section has a
//! `#[serde(default)]` so a partial file (or no file) still loads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Largest accepted receipt upload, in bytes.
    pub max_upload_bytes: usize,
    /// Allow any origin (development frontends).
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_permissive: true,
        }
    }
}

// ---------------------------------------------------------------------------
// External services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrProviderKind {
    #[default]
    GoogleVision,
    Mock,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrConfig {
    pub provider: OcrProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override the service endpoint (filled in by defaults when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    #[default]
    Gemini,
    #[serde(rename = "openrouter")]
    OpenRouter,
    Ollama,
    Mock,
}

impl LlmProviderKind {
    pub fn requires_api_key(self) -> bool {
        matches!(self, Self::Gemini | Self::OpenRouter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model id; defaults depend on the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            api_key: None,
            model: None,
            base_url: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// How the parsing stage treats the language model's reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Decode and validate; re-prompt with the decode error on failure.
    #[default]
    Strict,
    /// Accept whatever text comes back.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            backoff_factor: DEFAULT_RETRY_BACKOFF_FACTOR,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub decode_policy: DecodePolicy,
    /// Re-prompts allowed after the first response fails to decode.
    pub max_correction_attempts: u32,
    /// Upper bound on concurrent calls to external services.
    pub max_in_flight: usize,
    pub call_timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decode_policy: DecodePolicy::default(),
            max_correction_attempts: DEFAULT_MAX_CORRECTION_ATTEMPTS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            retry: RetrySettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "llm:\n  provider: openrouter\n  model: openai/gpt-4o-mini\npipeline:\n  decodePolicy: lenient\n";
        let cfg: PantryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.llm.provider, LlmProviderKind::OpenRouter);
        assert_eq!(cfg.llm.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(cfg.llm.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(cfg.pipeline.decode_policy, DecodePolicy::Lenient);
        assert_eq!(cfg.pipeline.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(cfg.server.port, DEFAULT_PORT);
    }

    #[test]
    fn provider_names_are_snake_case() {
        let cfg: OcrConfig = serde_yaml::from_str("provider: google_vision").unwrap();
        assert_eq!(cfg.provider, OcrProviderKind::GoogleVision);
    }
}
