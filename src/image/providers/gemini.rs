//! Google Generative Language provider (Imagen for generation, Gemini for editing).

use crate::error::{parse_retry_after, sanitize_error_message, Result, StudioError};
use crate::image::service::ImageService;
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationOptions, InputImage, RequestMode,
    MAX_IMAGE_COUNT,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for text-to-image generation.
pub const DEFAULT_GENERATE_MODEL: &str = "imagen-4.0-generate-001";

/// Default model for image editing.
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Finish reasons that mean the candidate was withheld by a safety filter.
const BLOCKED_FINISH_REASONS: [&str; 7] = [
    "SAFETY",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
    "IMAGE_RECITATION",
    "RECITATION",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
];

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    generate_model: Option<String>,
    edit_model: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY`, `GOOGLE_API_KEY`
    /// and `API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides the API root (useful for proxies and tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model used for text-to-image generation.
    pub fn generate_model(mut self, model: impl Into<String>) -> Self {
        self.generate_model = Some(model.into());
        self
    }

    /// Sets the model used for image editing.
    pub fn edit_model(mut self, model: impl Into<String>) -> Self {
        self.edit_model = Some(model.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(api_key_from_env)
            .ok_or_else(|| {
                StudioError::Auth(format!(
                    "no API key provided and none of {} is set",
                    API_KEY_ENV_VARS.join(", ")
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(GeminiProvider {
            client,
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            generate_model: self
                .generate_model
                .unwrap_or_else(|| DEFAULT_GENERATE_MODEL.to_string()),
            edit_model: self
                .edit_model
                .unwrap_or_else(|| DEFAULT_EDIT_MODEL.to_string()),
        })
    }
}

/// First non-empty API key found in the environment.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

/// Image service backed by the Google Generative Language API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    generate_model: String,
    edit_model: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Model used for generation.
    pub fn generate_model(&self) -> &str {
        &self.generate_model
    }

    /// Model used for editing.
    pub fn edit_model(&self) -> &str {
        &self.edit_model
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }
        Ok(response)
    }

    async fn generate_impl(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<GeneratedImage>> {
        let start = Instant::now();
        let url = self.model_url(&self.generate_model, "predict");
        let body = PredictRequest::new(prompt, options);

        tracing::debug!(
            model = %self.generate_model,
            count = options.count,
            aspect_ratio = ?options.aspect_ratio,
            "sending image generation request"
        );

        let response: PredictResponse = self.post_json(&url, &body).await?.json().await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut images = Vec::new();
        let mut filtered_reason = None;
        for prediction in response.predictions {
            match prediction.bytes_base64_encoded {
                Some(encoded) => images.push(GeneratedImage::from_base64(
                    &encoded,
                    prediction.mime_type.as_deref(),
                    GenerationMetadata {
                        model: Some(self.generate_model.clone()),
                        mode: RequestMode::Generate,
                        duration_ms: Some(duration_ms),
                    },
                )?),
                None => {
                    if let Some(reason) = prediction.rai_filtered_reason {
                        filtered_reason = Some(reason);
                    }
                }
            }
        }

        if images.is_empty() {
            if let Some(reason) = filtered_reason {
                return Err(StudioError::ContentBlocked(reason));
            }
        }

        tracing::debug!(images = images.len(), duration_ms, "image generation complete");
        Ok(images)
    }

    async fn edit_impl(&self, prompt: &str, image: &InputImage) -> Result<Vec<GeneratedImage>> {
        let start = Instant::now();
        let url = self.model_url(&self.edit_model, "generateContent");
        let body = GenerateContentRequest::new(prompt, image);

        tracing::debug!(
            model = %self.edit_model,
            input_bytes = image.size(),
            mime_type = image.mime_type(),
            "sending image edit request"
        );

        let response: GenerateContentResponse = self.post_json(&url, &body).await?.json().await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        // Prompt-level blocks arrive as HTTP 200 with no candidates.
        if let Some(feedback) = response.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
                return Err(StudioError::ContentBlocked(msg));
            }
        }

        let mut images = Vec::new();
        let mut blocked_reason = None;
        for candidate in response.candidates {
            if let Some(reason) = candidate.finish_reason {
                if BLOCKED_FINISH_REASONS.contains(&reason.as_str()) {
                    blocked_reason = Some(reason);
                }
            }
            let Some(content) = candidate.content else {
                continue;
            };
            for part in content.parts {
                if let Some(text) = part.text {
                    tracing::debug!(text = %text, "model returned text alongside the edit");
                }
                if let Some(inline) = part.inline_data {
                    images.push(GeneratedImage::from_base64(
                        &inline.data,
                        Some(&inline.mime_type),
                        GenerationMetadata {
                            model: Some(self.edit_model.clone()),
                            mode: RequestMode::Edit,
                            duration_ms: Some(duration_ms),
                        },
                    )?);
                }
            }
        }

        if images.is_empty() {
            if let Some(reason) = blocked_reason {
                return Err(StudioError::ContentBlocked(format!(
                    "Content blocked by safety filter: {reason}"
                )));
            }
        }

        tracing::debug!(images = images.len(), duration_ms, "image edit complete");
        Ok(images)
    }
}

/// Maps a non-success HTTP response to an error.
fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> StudioError {
    let text = sanitize_error_message(text);
    let lower = text.to_lowercase();

    if status == 401 || status == 403 {
        return StudioError::Auth(text);
    }
    // An unknown key is reported as 400 INVALID_ARGUMENT.
    if lower.contains("api key not valid") || lower.contains("api_key_invalid") {
        return StudioError::Auth(text);
    }
    if status == 429 {
        if lower.contains("quota") || lower.contains("resource_exhausted") {
            return StudioError::QuotaExceeded(text);
        }
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return StudioError::RateLimited { retry_after };
    }
    if status == 404 {
        return StudioError::InvalidRequest(text);
    }
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
        return StudioError::ContentBlocked(text);
    }
    if status == 400 {
        return StudioError::InvalidRequest(text);
    }
    StudioError::Api {
        status,
        message: text,
    }
}

#[async_trait]
impl ImageService for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<GeneratedImage>> {
        self.generate_impl(prompt, options).await
    }

    async fn edit(&self, prompt: &str, image: &InputImage) -> Result<Vec<GeneratedImage>> {
        self.edit_impl(prompt, image).await
    }

    fn name(&self) -> &str {
        "Gemini / Imagen (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        for model in [&self.generate_model, &self.edit_model] {
            let url = format!("{}/v1beta/models/{}", self.base_url, model);
            let response = self
                .client
                .get(&url)
                .header("x-goog-api-key", &self.api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let headers = response.headers().clone();
                let text = response.text().await.unwrap_or_default();
                return Err(parse_error(status.as_u16(), &text, &headers));
            }
            tracing::debug!(model = %model, "model reachable");
        }
        Ok(())
    }
}

// Imagen :predict request/response types
#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_mime_type: Option<&'static str>,
}

impl PredictRequest {
    fn new(prompt: &str, options: &GenerationOptions) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: options.count.clamp(1, MAX_IMAGE_COUNT),
                aspect_ratio: options.aspect_ratio.map(|r| r.as_str()),
                output_mime_type: options.format.map(|f| f.mime_type()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}

// Gemini :generateContent request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

impl GenerateContentRequest {
    fn new(prompt: &str, image: &InputImage) -> Self {
        // Image first, then the instruction.
        let parts = vec![
            RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: image.to_base64(),
                },
            },
            RequestPart::Text {
                text: prompt.to_string(),
            },
        ];

        Self {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}
