//! Settings: defaults, then a TOML file, then environment variables.
//!
//! Command-line flags are applied on top by the binary.

use crate::error::{Result, StudioError};
use crate::image::providers::{
    GeminiProvider, API_KEY_ENV_VARS, DEFAULT_BASE_URL, DEFAULT_EDIT_MODEL,
    DEFAULT_GENERATE_MODEL,
};
use crate::image::AspectRatio;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PROMPT_STUDIO_CONFIG";

const ENV_PREFIX: &str = "PROMPT_STUDIO_";

/// Effective settings for the studio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API key for the image service.
    pub api_key: Option<String>,
    /// API root.
    pub base_url: String,
    /// Model used for text-to-image generation.
    pub generate_model: String,
    /// Model used for image editing.
    pub edit_model: String,
    /// Where images go when no output path is given.
    pub output_dir: PathBuf,
    /// Default aspect ratio for generation.
    pub aspect_ratio: Option<AspectRatio>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            generate_model: DEFAULT_GENERATE_MODEL.to_string(),
            edit_model: DEFAULT_EDIT_MODEL.to_string(),
            output_dir: PathBuf::from("."),
            aspect_ratio: None,
            timeout_secs: 120,
        }
    }
}

/// `<config dir>/prompt-studio/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("prompt-studio").join("config.toml"))
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// `explicit` (or `$PROMPT_STUDIO_CONFIG`) must point at a readable file;
    /// the default location is only read when it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, |name| std::env::var(name).ok())
    }

    /// Same as [`Settings::load`] with a custom environment lookup.
    pub fn load_with<F>(explicit: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => env(CONFIG_ENV_VAR).map(PathBuf::from),
        };

        let mut settings = match path {
            Some(p) => Self::from_file(&p)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };

        settings.apply_env(env)?;
        Ok(settings)
    }

    /// Parses a TOML settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StudioError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings = toml::from_str(&raw)
            .map_err(|e| StudioError::Config(format!("invalid {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(settings)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            env(format!("{ENV_PREFIX}{suffix}").as_str()).filter(|v| !v.trim().is_empty())
        };

        if let Some(v) = var("API_KEY") {
            self.api_key = Some(v);
        } else if self.api_key.is_none() {
            // Service-wide key variables only fill a gap.
            self.api_key = API_KEY_ENV_VARS
                .iter()
                .filter_map(|name| env(*name))
                .find(|v| !v.trim().is_empty());
        }
        if let Some(v) = var("BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = var("GENERATE_MODEL") {
            self.generate_model = v;
        }
        if let Some(v) = var("EDIT_MODEL") {
            self.edit_model = v;
        }
        if let Some(v) = var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = var("ASPECT_RATIO") {
            let ratio = v
                .parse::<AspectRatio>()
                .map_err(|e| StudioError::Config(format!("{ENV_PREFIX}ASPECT_RATIO: {e}")))?;
            self.aspect_ratio = Some(ratio);
        }
        if let Some(v) = var("TIMEOUT_SECS") {
            self.timeout_secs = v.trim().parse::<u64>().map_err(|_| {
                StudioError::Config(format!("{ENV_PREFIX}TIMEOUT_SECS must be a number, got '{v}'"))
            })?;
        }
        Ok(())
    }

    /// Builds the image service these settings describe.
    pub fn provider(&self) -> Result<GeminiProvider> {
        let mut builder = GeminiProvider::builder()
            .base_url(&self.base_url)
            .generate_model(&self.generate_model)
            .edit_model(&self.edit_model)
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = self.api_key.as_deref().map(mask_key);
        copy
    }
}

fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 8 {
        return "****".to_string();
    }
    let tail: String = key.chars().skip(len - 4).collect();
    format!("****{tail}")
}
