//! Image service trait and utilities.

use crate::error::Result;
use crate::image::types::{GeneratedImage, GenerationOptions, InputImage};
use async_trait::async_trait;

/// The two capabilities of an external generative-image service.
///
/// Both calls may legitimately return an empty list; deciding whether that
/// is an error is left to the caller.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generates images from a text prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<GeneratedImage>>;

    /// Edits a reference image according to a text prompt.
    async fn edit(&self, prompt: &str, image: &InputImage) -> Result<Vec<GeneratedImage>>;

    /// Returns the name of this service for display.
    fn name(&self) -> &str;

    /// Checks if the service is reachable and the key is accepted.
    async fn health_check(&self) -> Result<()>;
}

/// Extension trait for services with retry logic.
///
/// Nothing in [`Studio`](crate::studio::Studio) uses this; it exists for
/// library callers who want it.
#[async_trait]
pub trait ImageServiceExt: ImageService {
    /// Generates with automatic retries on transient failures.
    async fn generate_with_retries(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        max_retries: u32,
    ) -> Result<Vec<GeneratedImage>> {
        let mut attempt = 0;
        loop {
            match self.generate(prompt, options).await {
                Ok(images) => return Ok(images),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    let delay = e.retry_after().unwrap_or(std::time::Duration::from_secs(1));
                    tracing::warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis(),
                        "retrying after transient error: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T: ImageService + ?Sized> ImageServiceExt for T {}
