//! Basic image generation example.
//!
//! Run with: `cargo run --example generate_image -- "a prompt"`
//!
//! Requires `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) environment variable.

use prompt_studio::{AspectRatio, GeminiProvider, GenerationOptions, Studio, SubmitForm};

#[tokio::main]
async fn main() -> prompt_studio::Result<()> {
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "A golden retriever puppy playing in snow".to_string());

    let studio = Studio::new(GeminiProvider::builder().build()?);
    let form = SubmitForm::new(prompt)
        .with_options(GenerationOptions::new().with_aspect_ratio(AspectRatio::Landscape));

    let submission = studio.submit(form).await?;
    let path = format!("output.{}", submission.image.format.extension());
    submission.image.save(&path)?;
    println!(
        "Generated image: {} ({} bytes)",
        path,
        submission.image.size()
    );

    Ok(())
}
