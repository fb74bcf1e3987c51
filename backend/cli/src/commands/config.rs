//! `pantry config`: show the effective configuration and its problems.

use std::path::Path;

use anyhow::{bail, Result};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

pub async fn run(path: &Path) -> Result<()> {
    let (config, report) = pantry_config::load_with_report(path).await?;

    note_info(&format!("Config file: {}", path.display()));
    println!("{}", serde_json::to_string_pretty(&pantry_config::redacted_view(&config)?)?);

    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    if !report.is_valid() {
        bail!("configuration has {} error(s)", report.errors.len());
    }
    note_success("Configuration is valid");
    Ok(())
}
