//! Error types for image generation and editing.

use std::time::Duration;

/// Maximum length of a service error message kept in an error value.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while submitting a prompt.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// API key missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized message from the response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the service, if any.
        retry_after: Option<Duration>,
    },

    /// Quota for the API key is used up.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// The service rejected the request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// User input failed validation before any request was made.
    #[error("{0}")]
    InvalidInput(String),

    /// A submission is already in flight.
    #[error("a request is already in progress")]
    Busy,

    /// The service answered successfully but returned no image.
    #[error("no image was returned")]
    NoImages,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading the input image, saving the output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StudioError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Result type alias for prompt-studio operations.
pub type Result<T> = std::result::Result<T, StudioError>;

/// Reduces a raw error body to a short, single-line message.
///
/// Google APIs answer with `{"error": {"code", "message", "status"}}`; when
/// the body has that shape only the message (and status) is kept.
pub fn sanitize_error_message(text: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            let err = v.get("error")?;
            let message = err.get("message")?.as_str()?.to_string();
            match err.get("status").and_then(|s| s.as_str()) {
                Some(status) => Some(format!("{message} ({status})")),
                None => Some(message),
            }
        });

    let raw = extracted.as_deref().unwrap_or(text);
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        collapsed
    }
}

/// Parses a `Retry-After` header given in seconds.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
