//! Structured logging for Pantry.
//!
//! Console and rolling-file `tracing` output, plus scrubbing of API keys
//! from strings that end up in logs or error payloads.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LoggerOptions};
pub use redact::redact_sensitive_data;
