use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use pantry_config::PantryConfig;
use pantry_core::{
    ParseResult, PipelineResult, SuggestionResult, TextCompleter, TextExtractor,
};

use crate::extraction::extract_text;
use crate::guard::CallGuard;
use crate::parsing::{parse_receipt, suggest_meals, ParseSettings};
use crate::retry::RetryPolicy;

/// Construction-time options for [`ReceiptPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub parse: ParseSettings,
    pub max_in_flight: usize,
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&PantryConfig::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &PantryConfig) -> Self {
        let pipeline = &config.pipeline;
        Self {
            parse: ParseSettings {
                decode_policy: pipeline.decode_policy,
                max_correction_attempts: pipeline.max_correction_attempts,
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
            max_in_flight: pipeline.max_in_flight,
            call_timeout: Duration::from_secs(pipeline.call_timeout_secs),
            retry: RetryPolicy::from(&pipeline.retry),
        }
    }
}

/// OCR extraction followed by structured parsing.
///
/// Cheap to share behind an `Arc`; concurrent calls only share the client
/// handles and the call guard.
pub struct ReceiptPipeline {
    extractor: Arc<dyn TextExtractor>,
    completer: Arc<dyn TextCompleter>,
    guard: CallGuard,
    parse: ParseSettings,
}

impl ReceiptPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        completer: Arc<dyn TextCompleter>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            completer,
            guard: CallGuard::new(options.max_in_flight, options.call_timeout, options.retry),
            parse: options.parse,
        }
    }

    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }

    pub fn completer_name(&self) -> &str {
        self.completer.name()
    }

    /// Run both stages over one image.
    ///
    /// A failed extraction short-circuits: the model is never called and the
    /// result has no `parse`.
    #[instrument(skip_all, fields(bytes = image.len()))]
    pub async fn process(&self, image: &[u8]) -> PipelineResult {
        let extraction = extract_text(self.extractor.as_ref(), &self.guard, image).await;
        if !extraction.outcome.is_success() {
            info!("Extraction failed, skipping parsing");
            return PipelineResult::short_circuit(extraction);
        }

        let parse = self.parse_text(&extraction.full_text).await;
        PipelineResult::completed(extraction, parse)
    }

    /// Run only the parsing stage over text already extracted.
    pub async fn parse_text(&self, receipt_text: &str) -> ParseResult {
        parse_receipt(self.completer.as_ref(), &self.guard, &self.parse, receipt_text).await
    }

    #[instrument(skip_all, fields(ingredients = ingredients.len()))]
    pub async fn suggest_meals(&self, ingredients: &[String]) -> SuggestionResult {
        suggest_meals(self.completer.as_ref(), &self.guard, &self.parse, ingredients).await
    }
}
