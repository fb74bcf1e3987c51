//! Config validation: field checks with user-friendly error messages.

use crate::schema::{DecodePolicy, LlmProviderKind, OcrProviderKind, PantryConfig};
use thiserror::Error;

/// Correction rounds beyond this are allowed but flagged as costly.
const CORRECTION_ATTEMPTS_WARN_THRESHOLD: u32 = 5;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PantryConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_ocr(config, &mut report);
    validate_llm(config, &mut report);
    validate_pipeline(config, &mut report);
    report
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true)
}

fn validate_server(config: &PantryConfig, report: &mut ValidationReport) {
    let server = &config.server;
    if server.port == 0 {
        report.error("server.port", "port must be > 0");
    } else if server.port < 1024 && server.port != 80 && server.port != 443 {
        report.warn(
            "server.port",
            format!("Port {} requires elevated privileges; consider a port >= 1024", server.port),
        );
    }
    if server.max_upload_bytes == 0 {
        report.error("server.maxUploadBytes", "maxUploadBytes must be > 0");
    }
}

fn validate_ocr(config: &PantryConfig, report: &mut ValidationReport) {
    match config.ocr.provider {
        OcrProviderKind::GoogleVision => {
            if is_blank(&config.ocr.api_key) {
                report.error(
                    "ocr.apiKey",
                    "An API key is required for google_vision (set GOOGLE_VISION_API_KEY)",
                );
            }
        }
        OcrProviderKind::Mock => {
            report.warn("ocr.provider", "Mock OCR provider configured; results are canned");
        }
    }
}

fn validate_llm(config: &PantryConfig, report: &mut ValidationReport) {
    let llm = &config.llm;
    if llm.provider.requires_api_key() && is_blank(&llm.api_key) {
        report.error("llm.apiKey", "An API key is required for this provider");
    }
    if llm.provider == LlmProviderKind::Mock {
        report.warn("llm.provider", "Mock LLM provider configured; results are canned");
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        report.error("llm.temperature", "temperature must be within 0.0..=2.0");
    }
    if llm.max_tokens == 0 {
        report.error("llm.maxTokens", "maxTokens must be > 0");
    }
    if let Some(model) = &llm.model {
        if model.trim().is_empty() {
            report.error("llm.model", "model cannot be empty");
        }
    }
}

fn validate_pipeline(config: &PantryConfig, report: &mut ValidationReport) {
    let pipeline = &config.pipeline;
    if pipeline.max_in_flight == 0 {
        report.error("pipeline.maxInFlight", "maxInFlight must be >= 1");
    }
    if pipeline.call_timeout_secs == 0 {
        report.error("pipeline.callTimeoutSecs", "callTimeoutSecs must be >= 1");
    }
    if pipeline.retry.max_attempts == 0 {
        report.error("pipeline.retry.maxAttempts", "maxAttempts must be >= 1");
    }
    if pipeline.retry.backoff_factor < 1.0 {
        report.error("pipeline.retry.backoffFactor", "backoffFactor must be >= 1.0");
    }
    if pipeline.retry.max_delay_ms < pipeline.retry.base_delay_ms {
        report.warn(
            "pipeline.retry.maxDelayMs",
            "maxDelayMs is below baseDelayMs; every retry waits maxDelayMs",
        );
    }
    if pipeline.decode_policy == DecodePolicy::Strict
        && pipeline.max_correction_attempts > CORRECTION_ATTEMPTS_WARN_THRESHOLD
    {
        report.warn(
            "pipeline.maxCorrectionAttempts",
            "More than 5 correction rounds multiplies model cost per receipt",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_config() -> PantryConfig {
        let mut cfg = PantryConfig::default();
        cfg.ocr.provider = OcrProviderKind::Mock;
        cfg.llm.provider = LlmProviderKind::Mock;
        cfg
    }

    #[test]
    fn default_config_requires_keys() {
        let report = validate(&PantryConfig::default());
        assert!(!report.is_valid());
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"ocr.apiKey"));
        assert!(paths.contains(&"llm.apiKey"));
    }

    #[test]
    fn mock_config_is_valid_with_warnings() {
        let report = validate(&mock_config());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut cfg = mock_config();
        cfg.llm.provider = LlmProviderKind::Ollama;
        assert!(validate(&cfg).is_valid());
    }

    #[test]
    fn zero_in_flight_is_error() {
        let mut cfg = mock_config();
        cfg.pipeline.max_in_flight = 0;
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "pipeline.maxInFlight");
    }

    #[test]
    fn temperature_out_of_range_is_error() {
        let mut cfg = mock_config();
        cfg.llm.temperature = 3.5;
        assert!(!validate(&cfg).is_valid());
    }
}
