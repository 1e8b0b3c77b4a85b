//! User-facing messages for errors.
//!
//! The service reports most failures as free text, so classification is
//! done on the error's text first and on its variant second.

use crate::error::StudioError;

/// Shown when the key is missing or rejected.
pub const INVALID_API_KEY: &str =
    "Your API key is invalid or missing. Please check the key and try again.";

/// Shown when the key's project or the model cannot be found.
pub const KEY_NOT_FOUND: &str =
    "The API key's project or the requested model was not found. Please select a different API key.";

/// Shown when the key has run out of quota or is being throttled.
pub const QUOTA_EXCEEDED: &str =
    "You have exceeded your API quota. Please wait a while or check your plan and billing details.";

/// Shown when a safety filter withheld the result.
pub const SAFETY_BLOCKED: &str =
    "The request was blocked by the safety filter. Please try a different prompt or image.";

/// Shown when the call succeeded without an image.
pub const NO_IMAGE: &str = "The model did not return an image. Please try a different prompt.";

/// Shown when a submission is already running.
pub const BUSY: &str = "A request is already in progress. Please wait for it to finish.";

/// Maps an error to the message shown to the user.
pub fn user_message(err: &StudioError) -> String {
    match err {
        StudioError::InvalidInput(msg) => return msg.clone(),
        StudioError::Busy => return BUSY.to_string(),
        _ => {}
    }

    let text = err.to_string().to_lowercase();
    if text.contains("requested entity was not found") {
        return KEY_NOT_FOUND.to_string();
    }
    if text.contains("api key not valid")
        || text.contains("api_key_invalid")
        || matches!(err, StudioError::Auth(_))
    {
        return INVALID_API_KEY.to_string();
    }
    if text.contains("quota")
        || text.contains("resource_exhausted")
        || matches!(
            err,
            StudioError::QuotaExceeded(_) | StudioError::RateLimited { .. }
        )
    {
        return QUOTA_EXCEEDED.to_string();
    }
    if text.contains("safety")
        || text.contains("blocked")
        || matches!(err, StudioError::ContentBlocked(_))
    {
        return SAFETY_BLOCKED.to_string();
    }
    if matches!(err, StudioError::NoImages) {
        return NO_IMAGE.to_string();
    }

    format!("Failed to generate image: {err}")
}

/// True when the user has to pick another API key before retrying.
pub fn requires_key_reselection(err: &StudioError) -> bool {
    err.to_string()
        .to_lowercase()
        .contains("requested entity was not found")
}
