//! Per-frame upscaling.
//!
//! Two strategies share the [`Upscaler`] contract: a deterministic resize and
//! a model-backed upscaler that falls back to the resize whenever the model is
//! missing or a single inference fails.

pub mod model;
pub mod resize;

pub use model::ModelUpscaler;
pub use resize::ResizeUpscaler;

use crate::domain::jobs::ScaleFactor;
use crate::domain::media::Resolution;
use crate::error::FrameIoError;
use crate::ports::model::ModelLoader;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// How a frame was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleMethod {
    Model,
    /// The model is loaded but failed or returned nothing for this frame.
    Fallback,
    Resize,
}

pub trait Upscaler: Send + Sync {
    fn scale_factor(&self) -> ScaleFactor;

    /// Whether frames go through a loaded model at all.
    fn model_active(&self) -> bool {
        false
    }

    /// Reads `input`, writes exactly `scale_factor` times its size to `output`.
    /// Only undecodable input (or an unwritable output) is an error.
    fn upscale(&self, input: &Path, output: &Path) -> Result<UpscaleMethod, FrameIoError>;
}

/// Picks the strategy for a job. Model loading happens here, once.
pub fn build_upscaler(
    scale: ScaleFactor,
    use_ai: bool,
    loader: &dyn ModelLoader,
) -> Arc<dyn Upscaler> {
    if use_ai {
        Arc::new(ModelUpscaler::load(scale, loader))
    } else {
        Arc::new(ResizeUpscaler::new(scale))
    }
}

/// Largest side an upscaled frame may have.
pub const MAX_FRAME_DIMENSION: u32 = 32_768;

/// Output size for `frame` at `scale`, refusing overflow and oversize frames.
pub(crate) fn target_size(
    frame: &RgbImage,
    scale: ScaleFactor,
) -> Result<Resolution, FrameIoError> {
    let (width, height) = frame.dimensions();
    Resolution { width, height }
        .scaled(scale.get())
        .filter(|r| r.width <= MAX_FRAME_DIMENSION && r.height <= MAX_FRAME_DIMENSION)
        .ok_or(FrameIoError::Oversize {
            width,
            height,
            scale: scale.get(),
        })
}

pub(crate) fn read_frame(path: &Path) -> Result<RgbImage, FrameIoError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| FrameIoError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Encodes into a temporary file next to `path`, then renames it into place so
/// a failed write never leaves a partial frame at the target.
pub(crate) fn write_frame(image: RgbImage, path: &Path) -> Result<(), FrameIoError> {
    let encode_err = |source| FrameIoError::Encode {
        path: path.to_path_buf(),
        source,
    };
    let write_err = |source| FrameIoError::Write {
        path: path.to_path_buf(),
        source,
    };

    let format = ImageFormat::from_path(path).map_err(encode_err)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".frame-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(write_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut writer, format)
            .map_err(encode_err)?;
        writer.flush().map_err(write_err)?;
    }
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
