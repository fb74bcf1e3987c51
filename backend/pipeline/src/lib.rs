//! `pantry-pipeline`: the receipt ingestion pipeline.
//!
//! Stage 1 reads text out of a receipt image through a [`TextExtractor`];
//! stage 2 turns that text into receipt JSON through a [`TextCompleter`].
//! Both stages report failures as data on their results.
//!
//! [`TextExtractor`]: pantry_core::TextExtractor
//! [`TextCompleter`]: pantry_core::TextCompleter

pub mod decode;
pub mod extraction;
pub mod guard;
pub mod parsing;
pub mod pipeline;
pub mod prompts;
pub mod retry;

pub use decode::{decode_meals, decode_receipt, extract_json_payload, DecodeError};
pub use extraction::{extract_text, map_entries};
pub use guard::CallGuard;
pub use parsing::{parse_receipt, suggest_meals, ParseSettings};
pub use pipeline::{PipelineOptions, ReceiptPipeline};
pub use retry::RetryPolicy;
