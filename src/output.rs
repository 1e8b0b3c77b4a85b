//! Saving generated images to disk.

use crate::error::Result;
use crate::image::{GeneratedImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Decides where an image is written.
///
/// - an explicit path naming a file is used as-is
/// - an explicit path naming a directory (existing, or ending in a
///   separator) gets a generated file name inside it
/// - no path falls back to `default_dir` with a generated file name
pub fn resolve_output_path(
    requested: Option<&Path>,
    default_dir: &Path,
    image: &GeneratedImage,
) -> PathBuf {
    let file_name = image.suggested_file_name(timestamp_ms());

    match requested {
        Some(path) if is_directory_target(path) => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => default_dir.join(file_name),
    }
}

fn is_directory_target(path: &Path) -> bool {
    if path.is_dir() {
        return true;
    }
    let raw = path.as_os_str().to_string_lossy();
    raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR)
}

/// Writes the image, creating parent directories as needed.
pub fn save_image(image: &GeneratedImage, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image.save(path)?;
    tracing::debug!(path = %path.display(), bytes = image.size(), "saved image");
    Ok(path.to_path_buf())
}

/// Returns the format named by `path`'s extension when it differs from
/// `format`; `None` if they agree or the extension is not an image type.
pub fn extension_mismatch(path: &Path, format: ImageFormat) -> Option<ImageFormat> {
    let named = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension)?;
    (named != format).then_some(named)
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
