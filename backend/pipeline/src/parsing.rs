use tracing::{debug, info, warn};

use pantry_config::defaults::{
    DEFAULT_MAX_CORRECTION_ATTEMPTS, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use pantry_config::DecodePolicy;
use pantry_core::{
    CompletionRequest, FailureKind, Outcome, ParseResult, SuggestionResult, TextCompleter,
};

use crate::decode::{decode_meals, decode_receipt};
use crate::guard::CallGuard;
use crate::prompts::{correction_prompt, meal_prompt, receipt_prompt, RECEIPT_SYSTEM_PROMPT};

/// Knobs for the language-model calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSettings {
    pub decode_policy: DecodePolicy,
    pub max_correction_attempts: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            decode_policy: DecodePolicy::Strict,
            max_correction_attempts: DEFAULT_MAX_CORRECTION_ATTEMPTS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ParseSettings {
    fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..CompletionRequest::new(prompt)
        }
    }
}

/// Stage 2: ask the model for receipt JSON.
///
/// Under [`DecodePolicy::Strict`] a reply that fails to decode is answered
/// with a correction prompt, at most `max_correction_attempts` times; the
/// stage then fails as malformed, keeping the last reply. Under
/// [`DecodePolicy::Lenient`] the first reply is accepted as is.
pub async fn parse_receipt(
    completer: &dyn TextCompleter,
    guard: &CallGuard,
    settings: &ParseSettings,
    receipt_text: &str,
) -> ParseResult {
    let mut request = CompletionRequest {
        system_prompt: RECEIPT_SYSTEM_PROMPT.to_string(),
        json_output: true,
        ..settings.request(receipt_prompt(receipt_text))
    };
    let mut attempts = 0u32;
    let mut raw_response = String::new();

    loop {
        attempts += 1;
        let completion = match guard.run("llm", || completer.complete(&request)).await {
            Ok(completion) => completion,
            Err(err) => {
                warn!(provider = completer.name(), attempts, error = %err, "Receipt parsing call failed");
                return ParseResult {
                    raw_response,
                    receipt: None,
                    attempts,
                    outcome: Outcome::from(&err),
                };
            }
        };
        raw_response = completion.content;
        debug!(
            provider = %completion.provider,
            model = %completion.model,
            tokens = completion.tokens_used,
            latency_ms = completion.latency_ms,
            "Completion received"
        );

        let decoded = decode_receipt(&raw_response);
        match (settings.decode_policy, decoded) {
            (_, Ok(receipt)) => {
                info!(attempts, items = receipt.items.len(), "Receipt parsed");
                return ParseResult {
                    raw_response,
                    receipt: Some(receipt),
                    attempts,
                    outcome: Outcome::Success,
                };
            }
            (DecodePolicy::Lenient, Err(err)) => {
                debug!(error = %err, "Accepting undecoded reply");
                return ParseResult {
                    raw_response,
                    receipt: None,
                    attempts,
                    outcome: Outcome::Success,
                };
            }
            (DecodePolicy::Strict, Err(err)) if attempts <= settings.max_correction_attempts => {
                warn!(attempts, error = %err, "Reply did not decode, sending correction");
                request.prompt = correction_prompt(receipt_text, &raw_response, &err.to_string());
            }
            (DecodePolicy::Strict, Err(err)) => {
                warn!(attempts, error = %err, "Reply never decoded");
                return ParseResult {
                    raw_response,
                    receipt: None,
                    attempts,
                    outcome: Outcome::failure(
                        FailureKind::Malformed,
                        format!("response did not decode after {attempts} attempts: {err}"),
                    ),
                };
            }
        }
    }
}

/// Ask the model for meal ideas. The reply is kept verbatim; a decoded list
/// is attached when one can be read from it.
pub async fn suggest_meals(
    completer: &dyn TextCompleter,
    guard: &CallGuard,
    settings: &ParseSettings,
    ingredients: &[String],
) -> SuggestionResult {
    let request = settings.request(meal_prompt(ingredients));

    match guard.run("llm", || completer.complete(&request)).await {
        Ok(completion) => {
            let suggestions = decode_meals(&completion.content, ingredients);
            info!(
                ingredients = ingredients.len(),
                decoded = suggestions.as_ref().map_or(0, Vec::len),
                "Meal suggestions received"
            );
            SuggestionResult {
                raw_response: completion.content,
                suggestions,
                outcome: Outcome::Success,
            }
        }
        Err(err) => {
            warn!(provider = completer.name(), error = %err, "Meal suggestion call failed");
            SuggestionResult {
                raw_response: String::new(),
                suggestions: None,
                outcome: Outcome::from(&err),
            }
        }
    }
}
