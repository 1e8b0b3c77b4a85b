//! Image service implementations.

mod gemini;

pub use gemini::{
    api_key_from_env, GeminiProvider, GeminiProviderBuilder, API_KEY_ENV_VARS, DEFAULT_BASE_URL,
    DEFAULT_EDIT_MODEL, DEFAULT_GENERATE_MODEL,
};
