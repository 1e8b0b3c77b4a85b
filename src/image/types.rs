//! Core types for image generation and editing.

use crate::error::{Result, StudioError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Largest reference image accepted for inline upload (20 MiB).
pub const MAX_INPUT_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Largest number of images a single generate call may ask for.
pub const MAX_IMAGE_COUNT: u8 = 4;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format (accepted as input only).
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Attempts to detect format from a MIME type string.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Aspect ratios accepted by the generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 16:9 landscape (widescreen) aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1:1" => Ok(Self::Square),
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "4:3" => Ok(Self::Standard),
            "3:4" => Ok(Self::StandardPortrait),
            other => Err(StudioError::InvalidInput(format!(
                "Unsupported aspect ratio '{other}'. Use one of 1:1, 16:9, 9:16, 4:3, 3:4."
            ))),
        }
    }
}

/// Which of the two service capabilities a submission uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Text prompt only.
    Generate,
    /// Text prompt plus a reference image.
    Edit,
}

impl std::fmt::Display for RequestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

/// A reference image attached to an edit request.
#[derive(Clone, PartialEq, Eq)]
pub struct InputImage {
    data: Vec<u8>,
    format: ImageFormat,
}

impl std::fmt::Debug for InputImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputImage")
            .field("format", &self.format)
            .field("size", &self.data.len())
            .finish()
    }
}

fn too_large(len: u64) -> StudioError {
    StudioError::InvalidInput(format!(
        "The selected image is too large ({} bytes, limit is {} bytes).",
        len, MAX_INPUT_IMAGE_BYTES
    ))
}

impl InputImage {
    /// Validates raw bytes as a reference image.
    ///
    /// The format is taken from the magic bytes; `hint` (an extension or MIME
    /// type) is only consulted when the bytes are not recognised.
    pub fn from_bytes(data: Vec<u8>, hint: Option<&str>) -> Result<Self> {
        if data.is_empty() {
            return Err(StudioError::InvalidInput(
                "The selected image file is empty.".into(),
            ));
        }
        if data.len() > MAX_INPUT_IMAGE_BYTES {
            return Err(too_large(data.len() as u64));
        }

        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| {
                hint.and_then(|h| {
                    ImageFormat::from_mime_type(h).or_else(|| ImageFormat::from_extension(h))
                })
            })
            .ok_or_else(|| {
                StudioError::InvalidInput(
                    "The selected file is not a supported image (PNG, JPEG, WebP or GIF).".into(),
                )
            })?;

        Ok(Self { data, format })
    }

    /// Reads and validates a reference image from disk.
    ///
    /// The size limit is checked against the file's metadata before reading.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let len = std::fs::metadata(path)?.len();
        if len > MAX_INPUT_IMAGE_BYTES as u64 {
            return Err(too_large(len));
        }
        let data = std::fs::read(path)?;
        let ext = path.extension().and_then(|e| e.to_str());
        Self::from_bytes(data, ext)
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Detected image format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type sent alongside the inline data.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Size of the image in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encodes the image data as base64 for inline transport.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// Options applied to a generate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Aspect ratio; the service default is used when unset.
    pub aspect_ratio: Option<AspectRatio>,
    /// Number of images to request (1..=4).
    pub count: u8,
    /// Desired output format.
    pub format: Option<ImageFormat>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: None,
            count: 1,
            format: None,
        }
    }
}

impl GenerationOptions {
    /// Creates options with service defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    /// Sets the number of images, clamped to 1..=4.
    pub fn with_count(mut self, count: u8) -> Self {
        self.count = count.clamp(1, MAX_IMAGE_COUNT);
        self
    }

    /// Sets the desired output format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Metadata about a generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model that produced the image.
    pub model: Option<String>,
    /// Capability that was used.
    pub mode: RequestMode,
    /// Round-trip duration in milliseconds.
    pub duration_ms: Option<u64>,
}

impl GenerationMetadata {
    /// Creates metadata for the given mode.
    pub fn new(mode: RequestMode) -> Self {
        Self {
            model: None,
            mode,
            duration_ms: None,
        }
    }
}

/// A generated image with its data and metadata.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(data: Vec<u8>, format: ImageFormat, metadata: GenerationMetadata) -> Self {
        Self {
            data,
            format,
            metadata,
        }
    }

    /// Decodes a base64 payload returned by the service.
    ///
    /// The declared MIME type wins; magic bytes are used when it is missing
    /// or unknown, and PNG is assumed as a last resort.
    pub fn from_base64(
        encoded: &str,
        mime_type: Option<&str>,
        metadata: GenerationMetadata,
    ) -> Result<Self> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| StudioError::Decode(e.to_string()))?;

        let format = mime_type
            .and_then(ImageFormat::from_mime_type)
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .unwrap_or_default();

        Ok(Self::new(data, format, metadata))
    }

    /// Returns the actual format detected from magic bytes.
    pub fn detected_format(&self) -> Option<ImageFormat> {
        ImageFormat::from_magic_bytes(&self.data)
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// File name offered for download, e.g. `generated-image-1700000000000.png`.
    pub fn suggested_file_name(&self, timestamp_ms: u128) -> String {
        format!("generated-image-{timestamp_ms}.{}", self.format.extension())
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(b"GIF89a\x01\x00"),
            Some(ImageFormat::Gif)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_format_from_mime_type() {
        assert_eq!(
            ImageFormat::from_mime_type("image/png"),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_mime_type("IMAGE/JPEG"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_mime_type("text/plain"), None);
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Landscape);
        assert_eq!(" 3:4 ".parse::<AspectRatio>().unwrap(), AspectRatio::StandardPortrait);
        assert!("21:9".parse::<AspectRatio>().is_err());
        assert_eq!(AspectRatio::Portrait.to_string(), "9:16");
    }

    #[test]
    fn test_input_image_detects_from_bytes_over_hint() {
        let image = InputImage::from_bytes(PNG_MAGIC.to_vec(), Some("jpg")).unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_input_image_falls_back_to_hint() {
        let image = InputImage::from_bytes(vec![1, 2, 3], Some("image/webp")).unwrap();
        assert_eq!(image.format(), ImageFormat::WebP);
    }

    #[test]
    fn test_input_image_rejects_empty() {
        let err = InputImage::from_bytes(Vec::new(), Some("png")).unwrap_err();
        assert!(matches!(err, StudioError::InvalidInput(_)));
    }

    #[test]
    fn test_input_image_rejects_non_image() {
        let err = InputImage::from_bytes(b"hello world".to_vec(), Some("txt")).unwrap_err();
        assert!(err.to_string().contains("not a supported image"));
    }

    #[test]
    fn test_input_image_rejects_oversized() {
        let mut data = PNG_MAGIC.to_vec();
        data.resize(MAX_INPUT_IMAGE_BYTES + 1, 0);
        let err = InputImage::from_bytes(data, None).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_input_image_from_path_rejects_oversized_file() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        // Sparse, so nothing close to the limit is written to disk.
        file.as_file()
            .set_len(MAX_INPUT_IMAGE_BYTES as u64 + 1)
            .unwrap();

        let err = InputImage::from_path(file.path()).unwrap_err();
        assert!(matches!(err, StudioError::InvalidInput(_)));
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_input_image_from_path_uses_extension_hint() {
        let mut file = tempfile::Builder::new().suffix(".webp").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"not really magic").unwrap();

        let image = InputImage::from_path(file.path()).unwrap();
        assert_eq!(image.format(), ImageFormat::WebP);
    }

    #[test]
    fn test_options_count_is_clamped() {
        assert_eq!(GenerationOptions::new().count, 1);
        assert_eq!(GenerationOptions::new().with_count(0).count, 1);
        assert_eq!(GenerationOptions::new().with_count(9).count, MAX_IMAGE_COUNT);
    }

    #[test]
    fn test_from_base64_prefers_declared_mime() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(PNG_MAGIC);
        let image = GeneratedImage::from_base64(
            &encoded,
            Some("image/jpeg"),
            GenerationMetadata::new(RequestMode::Generate),
        )
        .unwrap();
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!(image.detected_format(), Some(ImageFormat::Png));
    }

    #[test]
    fn test_from_base64_rejects_garbage() {
        let err = GeneratedImage::from_base64(
            "not base64!!",
            None,
            GenerationMetadata::new(RequestMode::Edit),
        )
        .unwrap_err();
        assert!(matches!(err, StudioError::Decode(_)));
    }

    #[test]
    fn test_suggested_file_name_and_data_url() {
        let image = GeneratedImage::new(
            PNG_MAGIC.to_vec(),
            ImageFormat::Png,
            GenerationMetadata::new(RequestMode::Generate),
        );
        assert_eq!(
            image.suggested_file_name(1_700_000_000_000),
            "generated-image-1700000000000.png"
        );
        assert!(image.to_data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_request_mode_display() {
        assert_eq!(RequestMode::Generate.to_string(), "generate");
        assert_eq!(RequestMode::Edit.to_string(), "edit");
    }
}
