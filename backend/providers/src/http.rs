//! Shared HTTP error mapping for the service clients.

use pantry_core::ServiceError;
use pantry_logging::redact_sensitive_data;
use reqwest::Response;

/// Error bodies are cut to this many characters before being surfaced.
const MAX_ERROR_BODY_CHARS: usize = 512;

pub(crate) fn transport_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(redact_sensitive_data(&err.to_string()))
}

pub(crate) fn decode_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Decode(redact_sensitive_data(&err.to_string()))
}

/// Turn a non-2xx response into `ServiceError::Http`, preferring the
/// `error.message` field that Google and OpenAI-style APIs return.
pub(crate) async fn error_from_response(response: Response) -> ServiceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or(body);
    ServiceError::Http {
        status,
        body: redact_sensitive_data(&truncate(&message)),
    }
}

fn error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json["error"]["message"].as_str().map(str::to_string)
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_ERROR_BODY_CHARS {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push('…');
    cut
}
