//! Local adapters for single-host deployment.

pub mod ffmpeg;
pub mod http;
pub mod memory;
pub mod realesrgan;

pub use ffmpeg::FfmpegTool;
pub use http::{router, AppState};
pub use memory::MemoryJobStore;
pub use realesrgan::RealEsrganLoader;

use crate::application::{PipelineOrchestrator, PipelineSettings};
use crate::config::AppConfig;
use std::sync::Arc;

/// Wires the ffmpeg tool and the Real-ESRGAN loader into a pipeline.
pub fn local_pipeline(config: &AppConfig) -> PipelineOrchestrator {
    let media = FfmpegTool::new(config.ffmpeg_path.clone(), config.ffprobe_path.clone());
    let models = RealEsrganLoader {
        executable: config.realesrgan_path.clone(),
        model_dir: config.model_dir.clone(),
        model_name: config.model_name.clone(),
        native_scale: config.model_scale,
    };
    PipelineOrchestrator::new(
        Arc::new(media),
        Arc::new(models),
        PipelineSettings::from(config),
    )
}
