//! Environment variable substitution and overrides for config values.
//!
//! String values may reference `${VAR_NAME}` (uppercase names only), resolved
//! at load time. `$${VAR}` escapes to a literal `${VAR}`.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::schema::{LlmProviderKind, OcrProviderKind, PantryConfig};

/// `${VAR}` with an optional leading `$` marking an escape.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config value tree from `env`.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(substituted.into_owned()),
    }
}

/// Apply well-known environment variables on top of a loaded config.
///
/// Secrets are commonly provided this way rather than written into the file.
pub fn apply_env_overrides(config: &mut PantryConfig, env: &HashMap<String, String>) {
    let get = |name: &str| env.get(name).filter(|v| !v.is_empty()).cloned();

    if let Some(bind) = get("PANTRY_BIND") {
        config.server.bind_address = bind;
    }
    if let Some(port) = get("PANTRY_PORT").and_then(|p| p.parse().ok()) {
        config.server.port = port;
    }
    if let Some(provider) = get("PANTRY_OCR_PROVIDER") {
        match provider.as_str() {
            "google_vision" => config.ocr.provider = OcrProviderKind::GoogleVision,
            "mock" => config.ocr.provider = OcrProviderKind::Mock,
            other => debug!(value = %other, "Ignoring unknown PANTRY_OCR_PROVIDER"),
        }
    }
    if let Some(provider) = get("PANTRY_LLM_PROVIDER") {
        match provider.as_str() {
            "gemini" => config.llm.provider = LlmProviderKind::Gemini,
            "openrouter" => config.llm.provider = LlmProviderKind::OpenRouter,
            "ollama" => config.llm.provider = LlmProviderKind::Ollama,
            "mock" => config.llm.provider = LlmProviderKind::Mock,
            other => debug!(value = %other, "Ignoring unknown PANTRY_LLM_PROVIDER"),
        }
    }
    if config.ocr.api_key.is_none() {
        config.ocr.api_key = get("GOOGLE_VISION_API_KEY");
    }
    if config.llm.api_key.is_none() {
        config.llm.api_key = match config.llm.provider {
            LlmProviderKind::Gemini => get("GEMINI_API_KEY"),
            LlmProviderKind::OpenRouter => get("OPENROUTER_API_KEY"),
            LlmProviderKind::Ollama | LlmProviderKind::Mock => None,
        };
    }
    if config.llm.provider == LlmProviderKind::Ollama && config.llm.base_url.is_none() {
        config.llm.base_url = get("OLLAMA_URL");
    }
    if let Some(level) = get("RUST_LOG") {
        config.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_simple_var() {
        let v = json!({"llm": {"apiKey": "${GEMINI_API_KEY}"}});
        let result = resolve_env_vars_with(&v, &env(&[("GEMINI_API_KEY", "g-123")])).unwrap();
        assert_eq!(result["llm"]["apiKey"], "g-123");
    }

    #[test]
    fn substitutes_inside_larger_string() {
        let v = json!({"baseUrl": "http://${OLLAMA_HOST}:11434"});
        let result = resolve_env_vars_with(&v, &env(&[("OLLAMA_HOST", "gpu-box")])).unwrap();
        assert_eq!(result["baseUrl"], "http://gpu-box:11434");
    }

    #[test]
    fn error_on_missing_var_names_path() {
        let v = json!({"ocr": {"apiKey": "${MISSING_VAR}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_VAR"));
        assert!(err.contains("ocr.apiKey"));
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"note": "$${NOT_A_VAR}"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["note"], "${NOT_A_VAR}");
    }

    #[test]
    fn overrides_pick_key_for_provider() {
        let mut config = PantryConfig::default();
        let vars = env(&[
            ("PANTRY_LLM_PROVIDER", "openrouter"),
            ("OPENROUTER_API_KEY", "sk-or-1"),
            ("GEMINI_API_KEY", "g-1"),
            ("GOOGLE_VISION_API_KEY", "v-1"),
            ("PANTRY_PORT", "9090"),
        ]);
        apply_env_overrides(&mut config, &vars);
        assert_eq!(config.llm.provider, LlmProviderKind::OpenRouter);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-or-1"));
        assert_eq!(config.ocr.api_key.as_deref(), Some("v-1"));
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn file_values_win_over_env_keys() {
        let mut config = PantryConfig::default();
        config.llm.api_key = Some("from-file".to_string());
        apply_env_overrides(&mut config, &env(&[("GEMINI_API_KEY", "from-env")]));
        assert_eq!(config.llm.api_key.as_deref(), Some("from-file"));
    }
}
