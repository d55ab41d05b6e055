use crate::error::{InferenceError, ModelLoadError};
use image::RgbImage;

/// A loaded super-resolution model.
#[cfg_attr(test, mockall::automock)]
pub trait SuperResolutionModel: Send + Sync {
    /// Scale the model produces on its own, e.g. 4 for an x4 network.
    fn native_scale(&self) -> u32;

    /// `Ok(None)` means the model ran but produced nothing usable.
    fn infer(&self, frame: &RgbImage) -> Result<Option<RgbImage>, InferenceError>;
}

/// Loads a model artifact. Called once per upscaler.
#[cfg_attr(test, mockall::automock)]
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn SuperResolutionModel>, ModelLoadError>;
}
