//! Super-resolution through the `realesrgan-ncnn-vulkan` executable.

use crate::error::{InferenceError, ModelLoadError};
use crate::ports::model::{ModelLoader, SuperResolutionModel};
use image::RgbImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

#[derive(Debug, Clone)]
pub struct RealEsrganLoader {
    pub executable: PathBuf,
    pub model_dir: PathBuf,
    pub model_name: String,
    pub native_scale: u32,
}

impl RealEsrganLoader {
    fn model_files(&self) -> [PathBuf; 2] {
        [
            self.model_dir.join(format!("{}.param", self.model_name)),
            self.model_dir.join(format!("{}.bin", self.model_name)),
        ]
    }
}

impl ModelLoader for RealEsrganLoader {
    fn load(&self) -> Result<Box<dyn SuperResolutionModel>, ModelLoadError> {
        for file in self.model_files() {
            if !file.is_file() {
                return Err(ModelLoadError::NotFound(file));
            }
        }
        let executable = which::which(&self.executable).map_err(|e| {
            ModelLoadError::Runtime(format!("{:?} is not runnable: {}", self.executable, e))
        })?;

        Ok(Box::new(RealEsrganModel {
            executable,
            model_dir: self.model_dir.clone(),
            model_name: self.model_name.clone(),
            native_scale: self.native_scale,
        }))
    }
}

#[derive(Debug)]
pub struct RealEsrganModel {
    executable: PathBuf,
    model_dir: PathBuf,
    model_name: String,
    native_scale: u32,
}

impl SuperResolutionModel for RealEsrganModel {
    fn native_scale(&self) -> u32 {
        self.native_scale
    }

    fn infer(&self, frame: &RgbImage) -> Result<Option<RgbImage>, InferenceError> {
        let scratch = tempdir()?;
        let input = scratch.path().join("in.png");
        let output = scratch.path().join("out.png");
        frame.save(&input)?;

        let result = Command::new(&self.executable)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .arg("-n")
            .arg(&self.model_name)
            .arg("-m")
            .arg(&self.model_dir)
            .arg("-s")
            .arg(self.native_scale.to_string())
            .output()?;

        if !result.status.success() {
            return Err(InferenceError::Process(
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }
        if !output.exists() {
            return Ok(None);
        }
        Ok(Some(image::open(&output)?.to_rgb8()))
    }
}
