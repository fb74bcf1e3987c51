pub mod error;
pub mod traits;
pub mod types;

pub use error::ServiceError;
pub use traits::{Completion, CompletionRequest, RawTextEntry, TextCompleter, TextExtractor};
pub use types::{
    BoundingPoly, ExtractionResult, FailureKind, MealSuggestion, Outcome, ParseResult,
    PipelineResult, ReceiptData, ReceiptItem, SuggestedIngredient, SuggestionResult,
    TextAnnotation, Vertex,
};
