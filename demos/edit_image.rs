//! Image editing example - modifies an existing image with a text prompt.
//!
//! Run with: `cargo run --example edit_image -- <input_image.png>`
//!
//! Requires `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) environment variable.

use prompt_studio::messages::user_message;
use prompt_studio::{GeminiProvider, InputImage, Studio, SubmitForm};

#[tokio::main]
async fn main() -> prompt_studio::Result<()> {
    let input_path = std::env::args()
        .nth(1)
        .expect("Usage: edit_image <input_image.png>");

    let studio = Studio::new(GeminiProvider::builder().build()?);
    let form = SubmitForm::new("Make the colors more vibrant and add a warm sunset glow")
        .with_image(InputImage::from_path(&input_path)?);

    match studio.submit(form).await {
        Ok(submission) => {
            submission.image.save("edited.png")?;
            println!(
                "Edited image saved to edited.png ({} bytes)",
                submission.image.size()
            );
        }
        Err(e) => eprintln!("{}", user_message(&e)),
    }

    Ok(())
}
