use super::resize::ResizeUpscaler;
use super::{read_frame, target_size, write_frame, UpscaleMethod, Upscaler};
use crate::domain::jobs::ScaleFactor;
use crate::domain::media::Resolution;
use crate::error::{FrameIoError, ModelLoadError};
use crate::ports::model::{ModelLoader, SuperResolutionModel};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;
use tracing::{info, warn};

/// Kernel used to bring model output to the exact requested size.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Decided once at construction and never revisited.
pub enum ModelBackend {
    Available(Box<dyn SuperResolutionModel>),
    Unavailable(ModelLoadError),
}

/// Upscales through a super-resolution model, falling back to
/// [`ResizeUpscaler`] per frame on inference failure, or for every frame when
/// the model could not be loaded.
pub struct ModelUpscaler {
    backend: ModelBackend,
    fallback: ResizeUpscaler,
}

impl std::fmt::Debug for ModelUpscaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelUpscaler")
            .field("scale", &self.fallback.scale_factor())
            .field("model_active", &self.model_active())
            .finish()
    }
}

impl ModelUpscaler {
    pub fn load(scale: ScaleFactor, loader: &dyn ModelLoader) -> Self {
        let backend = match loader.load() {
            Ok(model) => {
                info!("Loaded upscaling model (native x{})", model.native_scale());
                ModelBackend::Available(model)
            }
            Err(e) => {
                warn!("{}. AI upscaling falls back to resize for this job", e);
                ModelBackend::Unavailable(e)
            }
        };
        Self::with_backend(scale, backend)
    }

    pub fn with_backend(scale: ScaleFactor, backend: ModelBackend) -> Self {
        Self {
            backend,
            fallback: ResizeUpscaler::new(scale),
        }
    }

    pub fn backend(&self) -> &ModelBackend {
        &self.backend
    }

    /// Runs the model and conforms its output to the requested size.
    /// `None` means this frame must use the fallback.
    fn infer(
        &self,
        model: &dyn SuperResolutionModel,
        frame: &RgbImage,
        target: Resolution,
        name: &Path,
    ) -> Option<RgbImage> {
        let output = match model.infer(frame) {
            Ok(Some(output)) => output,
            Ok(None) => {
                warn!("Model produced no output for {:?}, resizing instead", name);
                return None;
            }
            Err(e) => {
                warn!("AI upscaling failed for {:?}: {}. Resizing instead", name, e);
                return None;
            }
        };

        if output.dimensions() == (target.width, target.height) {
            Some(output)
        } else {
            Some(imageops::resize(
                &output,
                target.width,
                target.height,
                RESAMPLE_FILTER,
            ))
        }
    }
}

impl Upscaler for ModelUpscaler {
    fn scale_factor(&self) -> ScaleFactor {
        self.fallback.scale_factor()
    }

    fn model_active(&self) -> bool {
        matches!(self.backend, ModelBackend::Available(_))
    }

    fn upscale(&self, input: &Path, output: &Path) -> Result<UpscaleMethod, FrameIoError> {
        let frame = read_frame(input)?;
        let target = target_size(&frame, self.scale_factor())?;

        let model = match &self.backend {
            ModelBackend::Available(model) => model.as_ref(),
            ModelBackend::Unavailable(_) => {
                write_frame(self.fallback.resize(&frame)?, output)?;
                return Ok(UpscaleMethod::Resize);
            }
        };

        match self.infer(model, &frame, target, input) {
            Some(upscaled) => {
                write_frame(upscaled, output)?;
                Ok(UpscaleMethod::Model)
            }
            None => {
                write_frame(self.fallback.resize(&frame)?, output)?;
                Ok(UpscaleMethod::Fallback)
            }
        }
    }
}
