//! Configuration loaded from the environment.

use crate::domain::jobs::{JobConfig, ScaleFactor};
use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Raw uploads, one file per submission
    pub upload_dir: PathBuf,
    /// Finished videos
    pub output_dir: PathBuf,
    /// Per-job working directories
    pub temp_dir: PathBuf,
    /// Defaults for jobs that do not specify their own
    pub job_defaults: JobConfig,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub video_codec: String,
    pub pixel_format: String,
    pub realesrgan_path: PathBuf,
    pub model_dir: PathBuf,
    pub model_name: String,
    pub model_scale: u32,
    /// Frames upscaled concurrently within one job
    pub frame_workers: usize,
    /// Jobs in `processing` at the same time (served mode)
    pub max_concurrent_jobs: usize,
}

impl AppConfig {
    /// Load configuration from environment variables, after `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let scale: i64 = parse(&lookup, "SCALE_FACTOR", 2)?;
        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get().min(8))
            .unwrap_or(1);

        Ok(Self {
            addr: var("ADDR", "127.0.0.1"),
            port: var("PORT", "8001"),
            upload_dir: var("UPLOAD_DIR", "storage/uploads").into(),
            output_dir: var("OUTPUT_DIR", "storage/outputs").into(),
            temp_dir: var("TEMP_DIR", "storage/temp").into(),
            job_defaults: JobConfig {
                scale_factor: ScaleFactor::new(scale)?,
                use_ai: parse_bool("USE_AI", &var("USE_AI", "true"))?,
            },
            ffmpeg_path: var("FFMPEG_PATH", "ffmpeg").into(),
            ffprobe_path: var("FFPROBE_PATH", "ffprobe").into(),
            video_codec: var("VIDEO_CODEC", "libx264"),
            pixel_format: var("PIXEL_FORMAT", "yuv420p"),
            realesrgan_path: var("REALESRGAN_PATH", "realesrgan-ncnn-vulkan").into(),
            model_dir: var("MODEL_DIR", "models").into(),
            model_name: var("MODEL_NAME", "realesrgan-x4plus"),
            model_scale: parse(&lookup, "MODEL_SCALE", 4)?,
            frame_workers: parse::<usize, _>(&lookup, "FRAME_WORKERS", default_workers)?.max(1),
            max_concurrent_jobs: parse::<usize, _>(&lookup, "MAX_CONCURRENT_JOBS", 2)?.max(1),
        })
    }

    /// Creates the uploads, outputs and temp areas.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.upload_dir, &self.output_dir, &self.temp_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::UnusableDirectory {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
