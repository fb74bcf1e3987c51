//! Deterministic stand-ins for the external services.
//!
//! Used by tests throughout the workspace and by the `mock` provider setting
//! for offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pantry_core::{
    Completion, CompletionRequest, RawTextEntry, ServiceError, TextCompleter, TextExtractor,
    Vertex,
};

pub const SAMPLE_RECEIPT_JSON: &str = r#"{
  "store_name": "Corner Market",
  "date": "2024-03-09",
  "total_amount": 12.5,
  "items": [
    { "name": "Eggs (dozen)", "quantity": 1, "unit_price": 4.5, "total_price": 4.5 },
    { "name": "Spinach", "quantity": 2, "unit_price": 2.5, "total_price": 5.0 },
    { "name": "Feta", "quantity": 1, "unit_price": 3.0, "total_price": 3.0 }
  ]
}"#;

pub const SAMPLE_MEALS_JSON: &str = r#"[
  {
    "recipe_name": "Spinach and Feta Omelette",
    "ingredients": [
      { "name": "eggs", "available": true },
      { "name": "spinach", "available": true },
      { "name": "feta", "available": true },
      { "name": "butter", "available": false }
    ],
    "preparation_time": "15 minutes",
    "difficulty": "easy",
    "instructions": "Whisk the eggs, wilt the spinach, fold in feta."
  }
]"#;

/// OCR fake: returns the same entries (or error) for every image.
pub struct MockExtractor {
    result: Result<Vec<RawTextEntry>, ServiceError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn new(entries: Vec<RawTextEntry>) -> Self {
        Self {
            result: Ok(entries),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// The entries a receipt reading "Total: $12.50" would produce.
    pub fn sample_receipt() -> Self {
        let boxed = |text: &str, x: i32, w: i32| {
            RawTextEntry::new(text)
                .with_confidence(0.98)
                .with_vertices(vec![
                    Vertex::new(x, 10),
                    Vertex::new(x + w, 10),
                    Vertex::new(x + w, 30),
                    Vertex::new(x, 30),
                ])
        };
        Self::new(vec![
            RawTextEntry::new("Total: $12.50").with_vertices(vec![
                Vertex::new(0, 10),
                Vertex::new(120, 10),
                Vertex::new(120, 30),
                Vertex::new(0, 30),
            ]),
            boxed("Total:", 0, 50),
            boxed("$12.50", 60, 60),
        ])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect_text(&self, _image: &[u8]) -> Result<Vec<RawTextEntry>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

/// Language-model fake.
///
/// Answers, in order of precedence: the next scripted reply, the first rule
/// whose needle appears in the prompt, then the fixed fallback.
pub struct MockCompleter {
    script: Mutex<VecDeque<Result<String, ServiceError>>>,
    rules: Vec<(String, String)>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockCompleter {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            fallback: "Mock response".to_string(),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Canned receipt and meal answers, for offline runs.
    pub fn canned() -> Self {
        Self::new()
            .with_rule("Receipt text:", SAMPLE_RECEIPT_JSON)
            .with_rule("available ingredients", SAMPLE_MEALS_JSON)
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fallback = response.into();
        self
    }

    pub fn with_rule(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Queue a reply consumed by the next call.
    pub fn then_respond(mut self, response: impl Into<String>) -> Self {
        self.script.get_mut().push_back(Ok(response.into()));
        self
    }

    /// Queue a failure consumed by the next call.
    pub fn then_fail(mut self, error: ServiceError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

impl Default for MockCompleter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextCompleter for MockCompleter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        self.prompts.lock().await.push(request.prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().await.pop_front();
        let content = match scripted {
            Some(reply) => reply?,
            None => self
                .rules
                .iter()
                .find(|(needle, _)| request.prompt.contains(needle.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| self.fallback.clone()),
        };

        Ok(Completion {
            content,
            provider: "mock".to_string(),
            model: "mock".to_string(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_runs_before_rules_and_fallback() {
        let completer = MockCompleter::new()
            .with_response("fallback")
            .with_rule("receipt", "rule")
            .then_respond("first")
            .then_fail(ServiceError::reported("boom"));

        let receipt = CompletionRequest::new("a receipt");
        assert_eq!(completer.complete(&receipt).await.unwrap().content, "first");
        assert!(completer.complete(&receipt).await.is_err());
        assert_eq!(completer.complete(&receipt).await.unwrap().content, "rule");
        let other = CompletionRequest::new("something else");
        assert_eq!(completer.complete(&other).await.unwrap().content, "fallback");
        assert_eq!(completer.call_count().await, 4);
    }

    #[tokio::test]
    async fn extractor_counts_calls() {
        let extractor = MockExtractor::sample_receipt();
        let entries = extractor.detect_text(b"png").await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(extractor.call_count(), 1);
    }
}
