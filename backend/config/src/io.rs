//! Config file discovery and reading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Default config file name.
const CONFIG_FILE_NAME: &str = "pantry.yaml";

/// Resolve the config file path.
/// Priority: `PANTRY_CONFIG` env > `./pantry.yaml` > `<config dir>/pantry/pantry.yaml`.
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("PANTRY_CONFIG") {
        return PathBuf::from(path);
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("pantry").join(CONFIG_FILE_NAME);
    }
    local
}

/// Read the config file as a JSON value tree.
///
/// Returns an empty object if the file doesn't exist, so defaults apply.
pub async fn load_config_value(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value = parse_yaml_value(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    Ok(value)
}

/// Parse YAML text into a JSON value tree; an empty document is an empty object.
pub fn parse_yaml_value(raw: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(raw)?;
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_empty_object() {
        let value = load_config_value(Path::new("/definitely/not/here/pantry.yaml"))
            .await
            .unwrap();
        assert_eq!(value, Value::Object(Default::default()));
    }

    #[test]
    fn empty_document_is_empty_object() {
        assert_eq!(parse_yaml_value("").unwrap(), Value::Object(Default::default()));
    }

    #[test]
    fn parses_nested_sections() {
        let value = parse_yaml_value("server:\n  port: 9000\n").unwrap();
        assert_eq!(value["server"]["port"], 9000);
    }
}
