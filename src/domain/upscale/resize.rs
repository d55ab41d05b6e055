use super::{read_frame, target_size, write_frame, UpscaleMethod, Upscaler};
use crate::domain::jobs::ScaleFactor;
use crate::error::FrameIoError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;

/// Bicubic (Catmull-Rom) kernel used for every deterministic resize.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Deterministic resize. Same input and scale always yield the same pixels.
#[derive(Debug, Clone, Copy)]
pub struct ResizeUpscaler {
    scale: ScaleFactor,
}

impl ResizeUpscaler {
    pub fn new(scale: ScaleFactor) -> Self {
        Self { scale }
    }

    pub fn resize(&self, frame: &RgbImage) -> Result<RgbImage, FrameIoError> {
        let target = target_size(frame, self.scale)?;
        if self.scale.get() == 1 {
            return Ok(frame.clone());
        }
        Ok(imageops::resize(frame, target.width, target.height, RESIZE_FILTER))
    }
}

impl Upscaler for ResizeUpscaler {
    fn scale_factor(&self) -> ScaleFactor {
        self.scale
    }

    fn upscale(&self, input: &Path, output: &Path) -> Result<UpscaleMethod, FrameIoError> {
        let frame = read_frame(input)?;
        write_frame(self.resize(&frame)?, output)?;
        Ok(UpscaleMethod::Resize)
    }
}
