#![warn(missing_docs)]
//! Prompt Studio - turn a text prompt (and optionally a reference image)
//! into an image via Google's image models.
//!
//! A submission runs in one of two modes:
//!
//! - **generate**: prompt only, served by an Imagen model
//! - **edit**: prompt plus a reference image, served by a Gemini image model
//!
//! The mode is chosen by whether an image is attached. Each submission is a
//! single request; there is no retry on the submit path.
//!
//! # Quick Start
//!
//! ```no_run
//! use prompt_studio::{GeminiProvider, Studio, SubmitForm};
//!
//! #[tokio::main]
//! async fn main() -> prompt_studio::Result<()> {
//!     let studio = Studio::new(GeminiProvider::builder().build()?);
//!     let submission = studio.submit(SubmitForm::new("A lighthouse at dusk")).await?;
//!     submission.image.save("lighthouse.png")?;
//!     Ok(())
//! }
//! ```
//!
//! # Editing
//!
//! ```no_run
//! use prompt_studio::{GeminiProvider, InputImage, Studio, SubmitForm};
//!
//! #[tokio::main]
//! async fn main() -> prompt_studio::Result<()> {
//!     let studio = Studio::new(GeminiProvider::builder().build()?);
//!     let form = SubmitForm::new("Turn the sky purple")
//!         .with_image(InputImage::from_path("photo.jpg")?);
//!     match studio.submit(form).await {
//!         Ok(submission) => submission.image.save("edited.png")?,
//!         Err(e) => eprintln!("{}", prompt_studio::messages::user_message(&e)),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
mod error;
pub mod image;
pub mod messages;
pub mod output;
mod studio;

// Re-export error types at crate root
pub use error::{parse_retry_after, sanitize_error_message, Result, StudioError};

pub use config::Settings;
pub use image::providers::{GeminiProvider, GeminiProviderBuilder};
pub use image::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationOptions, ImageFormat,
    ImageService, ImageServiceExt, InputImage, RequestMode,
};
pub use studio::{Studio, SubmitForm, Submission};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, StudioError};
    pub use crate::image::providers::GeminiProvider;
    pub use crate::image::{GeneratedImage, GenerationOptions, ImageService, InputImage};
    pub use crate::studio::{Studio, SubmitForm};
}
