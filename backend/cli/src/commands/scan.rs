//! `pantry scan <image>`: one receipt through the full pipeline.

use std::path::Path;

use anyhow::{bail, Context, Result};

use pantry_pipeline::ReceiptPipeline;

use crate::terminal_output::{note_error, note_success};

pub async fn run(pipeline: &ReceiptPipeline, image: &Path, pretty: bool) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", image.display());
    }

    let result = pipeline.process(&bytes).await;

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");

    match result.outcome.message() {
        None => {
            let items = result
                .parse
                .as_ref()
                .and_then(|p| p.receipt.as_ref())
                .map_or(0, |r| r.items.len());
            note_success(&format!("Receipt processed ({items} items)"));
            Ok(())
        }
        Some(reason) => {
            note_error(reason);
            bail!("receipt processing failed")
        }
    }
}
