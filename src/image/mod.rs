//! Image generation and editing.

pub mod providers;
mod service;
mod types;

pub use service::{ImageService, ImageServiceExt};
pub use types::{
    AspectRatio, GeneratedImage, GenerationMetadata, GenerationOptions, ImageFormat, InputImage,
    RequestMode, MAX_IMAGE_COUNT, MAX_INPUT_IMAGE_BYTES,
};
