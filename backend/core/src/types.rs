use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The service may succeed if asked again (timeouts, throttling, 5xx).
    Transient,
    /// The service rejected the call; repeating it will not help.
    Persistent,
    /// The service answered, but not in the structure that was asked for.
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Persistent => write!(f, "persistent"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// Result status carried as data on every stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure { kind, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure { message, .. } => Some(message),
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<&ServiceError> for Outcome {
    fn from(err: &ServiceError) -> Self {
        let kind = if err.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::Persistent
        };
        Self::failure(kind, err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// A polygon corner in image pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

impl Vertex {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingPoly {
    pub vertices: Vec<Vertex>,
}

/// A single recognized token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub text: String,
    /// 0.0..=1.0; 0.0 when the service did not report one.
    pub confidence: f32,
    pub bounding_box: BoundingPoly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub full_text: String,
    pub annotations: Vec<TextAnnotation>,
    pub outcome: Outcome,
}

impl ExtractionResult {
    pub fn failed(outcome: Outcome) -> Self {
        Self {
            full_text: String::new(),
            annotations: Vec::new(),
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Structured receipt decoded from a language-model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    /// Last text returned by the language model, unmodified.
    pub raw_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptData>,
    /// Completion calls made, including correction rounds.
    pub attempts: u32,
    pub outcome: Outcome,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Aggregate returned for one receipt image.
///
/// `parse` is only ever present when the extraction succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub extraction: ExtractionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse: Option<ParseResult>,
    pub outcome: Outcome,
}

impl PipelineResult {
    /// Extraction failed; the parsing stage never ran.
    pub fn short_circuit(extraction: ExtractionResult) -> Self {
        let outcome = extraction.outcome.clone();
        Self {
            extraction,
            parse: None,
            outcome,
        }
    }

    pub fn completed(extraction: ExtractionResult, parse: ParseResult) -> Self {
        let outcome = parse.outcome.clone();
        Self {
            extraction,
            parse: Some(parse),
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Meal suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedIngredient {
    pub name: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSuggestion {
    pub name: String,
    pub ingredients: Vec<SuggestedIngredient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub raw_response: String,
    /// Present when the response happened to decode; never required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<MealSuggestion>>,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_status_tag() {
        let ok = serde_json::to_value(Outcome::Success).unwrap();
        assert_eq!(ok["status"], "success");

        let failed =
            serde_json::to_value(Outcome::failure(FailureKind::Persistent, "quota exceeded"))
                .unwrap();
        assert_eq!(failed["status"], "failure");
        assert_eq!(failed["kind"], "persistent");
        assert_eq!(failed["message"], "quota exceeded");
    }

    #[test]
    fn short_circuit_has_no_parse() {
        let extraction =
            ExtractionResult::failed(Outcome::failure(FailureKind::Persistent, "bad image"));
        let result = PipelineResult::short_circuit(extraction);
        assert!(result.parse.is_none());
        assert_eq!(result.outcome.message(), Some("bad image"));

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("parse").is_none());
    }

    #[test]
    fn outcome_from_service_error_keeps_message() {
        let err = ServiceError::reported("quota exceeded");
        let outcome = Outcome::from(&err);
        assert_eq!(outcome.kind(), Some(FailureKind::Persistent));
        assert_eq!(outcome.message(), Some("quota exceeded"));
    }
}
