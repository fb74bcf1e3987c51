//! `pantry-config`: Pantry runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, OCR and LLM providers, pipeline limits, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Well-known env var overrides for secrets and provider selection
//! - Provider-dependent defaults
//! - Validation and redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_file_path, load_config_value};
pub use redact::redact;
pub use schema::{
    DecodePolicy, LlmConfig, LlmProviderKind, LoggingConfig, OcrConfig, OcrProviderKind,
    PantryConfig, PipelineConfig, RetrySettings, ServerConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load the config file without rejecting invalid settings, returning the
/// validation report alongside.
///
/// Nothing is logged here, so callers can install logging from the loaded
/// config first and then hand the report to [`log_report`] and [`ensure_valid`].
pub async fn load_with_report(path: &Path) -> Result<(PantryConfig, ValidationReport)> {
    let value = load_config_value(path).await?;
    let env: HashMap<String, String> = std::env::vars().collect();
    let config = assemble(value, &env)?;
    let report = validate(&config);
    Ok((config, report))
}

/// Substitute env vars, deserialize, then apply overrides and defaults.
pub fn assemble(value: Value, env: &HashMap<String, String>) -> Result<PantryConfig> {
    let value =
        resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;

    let mut config: PantryConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;

    apply_env_overrides(&mut config, env);
    Ok(apply_all_defaults(config))
}

/// Emit every warning and error in the report as a log event.
pub fn log_report(report: &ValidationReport) {
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
}

/// Fail with a summary of the report's errors, if it has any.
pub fn ensure_valid(report: &ValidationReport) -> Result<()> {
    if !report.is_valid() {
        let summary: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration:\n  {}", summary.join("\n  "));
    }
    Ok(())
}

/// Serialize a config with secrets masked.
pub fn redacted_view(config: &PantryConfig) -> Result<Value> {
    let value = serde_json::to_value(config).context("Failed to serialize config")?;
    Ok(redact(&value))
}
