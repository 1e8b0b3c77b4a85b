//! The submit handler: collect input, pick a mode, make one call.

use crate::error::{Result, StudioError};
use crate::image::{GeneratedImage, GenerationOptions, ImageService, InputImage, RequestMode};
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything the user filled in for one submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitForm {
    /// Text prompt. Surrounding whitespace is ignored.
    pub prompt: String,
    /// Optional reference image; its presence selects edit mode.
    pub image: Option<InputImage>,
    /// Options for generate mode. Ignored when editing.
    pub options: GenerationOptions,
}

impl SubmitForm {
    /// Creates a form with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Attaches a reference image.
    pub fn with_image(mut self, image: InputImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Sets the generate-mode options.
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Mode that was used.
    pub mode: RequestMode,
    /// Trimmed prompt that was sent.
    pub prompt: String,
    /// The first image the service returned.
    pub image: GeneratedImage,
}

/// Drives one [`ImageService`] call per submission.
///
/// While a call is in flight the studio is busy and further submissions are
/// rejected with [`StudioError::Busy`].
pub struct Studio<S> {
    service: S,
    busy: AtomicBool,
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: ImageService> Studio<S> {
    /// Wraps an image service.
    pub fn new(service: S) -> Self {
        Self {
            service,
            busy: AtomicBool::new(false),
        }
    }

    /// The underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// True while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Edit iff a reference image is attached.
    pub fn mode_for(form: &SubmitForm) -> RequestMode {
        if form.image.is_some() {
            RequestMode::Edit
        } else {
            RequestMode::Generate
        }
    }

    /// Validates the form and makes exactly one service call.
    pub async fn submit(&self, form: SubmitForm) -> Result<Submission> {
        let prompt = form.prompt.trim();
        if prompt.is_empty() {
            return Err(StudioError::InvalidInput("Please enter a prompt.".into()));
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StudioError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let mode = Self::mode_for(&form);
        tracing::debug!(%mode, service = self.service.name(), "submitting prompt");

        let images = match &form.image {
            Some(image) => self.service.edit(prompt, image).await?,
            None => self.service.generate(prompt, &form.options).await?,
        };

        let returned = images.len();
        let image = images.into_iter().next().ok_or(StudioError::NoImages)?;
        if returned > 1 {
            tracing::debug!(returned, "keeping the first returned image");
        }

        Ok(Submission {
            mode,
            prompt: prompt.to_string(),
            image,
        })
    }
}
