use std::time::Duration;

use thiserror::Error;

/// Google RPC status codes that indicate the call may succeed if repeated:
/// DEADLINE_EXCEEDED, RESOURCE_EXHAUSTED, UNAVAILABLE.
const TRANSIENT_RPC_CODES: &[i32] = &[4, 8, 14];

/// Failure of a call to an external OCR or language-model service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service answered but embedded an error in its payload.
    #[error("{message}")]
    Reported { code: Option<i32>, message: String },

    #[error("service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not decode service response: {0}")]
    Decode(String),

    /// No usable content came back (empty candidates, blocked prompt, ...).
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn reported(message: impl Into<String>) -> Self {
        Self::Reported { code: None, message: message.into() }
    }

    /// Whether repeating the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Reported { code: Some(code), .. } => TRANSIENT_RPC_CODES.contains(code),
            Self::Reported { code: None, .. } | Self::Decode(_) | Self::Unavailable(_) => false,
        }
    }
}
