use tracing::{info, warn};

use pantry_core::{
    BoundingPoly, ExtractionResult, Outcome, RawTextEntry, TextAnnotation, TextExtractor,
};

use crate::guard::CallGuard;

/// Normalize raw OCR entries.
///
/// The first entry spans the whole image and becomes `full_text`; every
/// following entry becomes one annotation. A missing confidence is 0.0.
pub fn map_entries(entries: Vec<RawTextEntry>) -> ExtractionResult {
    let mut entries = entries.into_iter();
    let full_text = entries.next().map(|e| e.description).unwrap_or_default();

    let annotations = entries
        .map(|entry| TextAnnotation {
            text: entry.description,
            confidence: entry.confidence.unwrap_or(0.0),
            bounding_box: BoundingPoly {
                vertices: entry.vertices,
            },
        })
        .collect();

    ExtractionResult {
        full_text,
        annotations,
        outcome: Outcome::Success,
    }
}

/// Stage 1: run OCR over an image. Failures are returned as data.
pub async fn extract_text(
    extractor: &dyn TextExtractor,
    guard: &CallGuard,
    image: &[u8],
) -> ExtractionResult {
    let response = guard
        .run("ocr", || extractor.detect_text(image))
        .await;

    match response {
        Ok(entries) => {
            let result = map_entries(entries);
            info!(
                provider = extractor.name(),
                chars = result.full_text.len(),
                annotations = result.annotations.len(),
                "Text extracted"
            );
            result
        }
        Err(err) => {
            warn!(provider = extractor.name(), error = %err, "Text extraction failed");
            ExtractionResult::failed(Outcome::from(&err))
        }
    }
}
