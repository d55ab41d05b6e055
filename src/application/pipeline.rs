use super::workspace::WorkingDirectories;
use crate::config::AppConfig;
use crate::domain::frames::FrameSequence;
use crate::domain::jobs::{JobConfig, JobId, UpscaleResult};
use crate::domain::upscale::{build_upscaler, UpscaleMethod, Upscaler};
use crate::error::{ConfigError, FrameIoError, PipelineError};
use crate::ports::media::{AssembleRequest, MediaTool};
use crate::ports::model::ModelLoader;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Receives `(frames_done, frames_total)` after each upscaled frame.
pub trait ProgressObserver: Send + Sync {
    fn on_frame(&self, done: usize, total: usize);
}

pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_frame(&self, _done: usize, _total: usize) {}
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub video_codec: String,
    pub pixel_format: String,
    pub frame_workers: usize,
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            output_dir: config.output_dir.clone(),
            video_codec: config.video_codec.clone(),
            pixel_format: config.pixel_format.clone(),
            frame_workers: config.frame_workers,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FrameTally {
    frames: usize,
    fallback: usize,
}

/// Drives one video through inspection, extraction, per-frame upscale, reassembly.
pub struct PipelineOrchestrator {
    media: Arc<dyn MediaTool>,
    models: Arc<dyn ModelLoader>,
    settings: PipelineSettings,
}

impl PipelineOrchestrator {
    pub fn new(
        media: Arc<dyn MediaTool>,
        models: Arc<dyn ModelLoader>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            media,
            models,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs a one-off job with a fresh id and no progress reporting.
    pub async fn process_video(
        &self,
        input: &Path,
        config: &JobConfig,
    ) -> Result<UpscaleResult, PipelineError> {
        self.process(&JobId::new(), input, config, &NoProgress).await
    }

    pub async fn process(
        &self,
        job_id: &JobId,
        input: &Path,
        config: &JobConfig,
        progress: &dyn ProgressObserver,
    ) -> Result<UpscaleResult, PipelineError> {
        let started = Instant::now();

        info!("[Job {}] Extracting metadata for {:?}", job_id, input);
        let meta = self.media.inspect(input).await?;
        info!(
            "[Job {}] Original resolution: {} | FPS: {}",
            job_id, meta.resolution, meta.frame_rate
        );

        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let dirs = WorkingDirectories::create(&self.settings.temp_dir, &stem, job_id)?;

        info!("[Job {}] Extracting frames", job_id);
        self.media.extract_frames(input, dirs.extraction()).await?;

        let frames = FrameSequence::scan(dirs.extraction()).map_err(|source| FrameIoError::Read {
            path: dirs.extraction().to_path_buf(),
            source,
        })?;
        if frames.is_empty() {
            return Err(FrameIoError::NoFrames(input.to_path_buf()).into());
        }
        info!("[Job {}] Extracted {} frames", job_id, frames.len());

        let upscaler = build_upscaler(config.scale_factor, config.use_ai, self.models.as_ref());
        info!(
            "[Job {}] Upscaling frames (scale: {}x, model: {})",
            job_id,
            config.scale_factor,
            upscaler.model_active()
        );
        let tally = self
            .upscale_frames(upscaler.clone(), &frames, dirs.processed(), progress)
            .await?;
        if tally.fallback > 0 {
            warn!(
                "[Job {}] {} of {} frames fell back to resize",
                job_id, tally.fallback, tally.frames
            );
        }

        let processed = FrameSequence::scan(dirs.processed()).map_err(|source| FrameIoError::Read {
            path: dirs.processed().to_path_buf(),
            source,
        })?;
        if processed.len() != frames.len() {
            return Err(FrameIoError::CountMismatch {
                extracted: frames.len(),
                processed: processed.len(),
            }
            .into());
        }

        let output_path = self.output_path(&stem, config)?;
        info!("[Job {}] Assembling video into {:?}", job_id, output_path);
        self.media
            .assemble(AssembleRequest {
                frames_dir: dirs.processed(),
                audio_source: input,
                output_path: &output_path,
                frame_rate: meta.frame_rate,
                video_codec: &self.settings.video_codec,
                pixel_format: &self.settings.pixel_format,
            })
            .await
            .map_err(PipelineError::Assembly)?;
        make_world_readable(&output_path);

        let final_meta = self.media.inspect(&output_path).await?;
        let elapsed = started.elapsed().as_secs_f64();

        info!("[Job {}] Cleaning up temporary files", job_id);
        drop(dirs);

        Ok(UpscaleResult {
            output_path,
            original_resolution: meta.resolution,
            new_resolution: final_meta.resolution,
            process_duration_sec: (elapsed * 100.0).round() / 100.0,
            filesize: final_meta.file_size,
            frames: tally.frames,
            fallback_frames: tally.fallback,
            model_active: upscaler.model_active(),
        })
    }

    /// Upscales every frame once, at most `frame_workers` at a time. Output
    /// keeps the input file name, so numbering survives out-of-order execution.
    /// After the first failure no new frames start; in-flight ones finish.
    async fn upscale_frames(
        &self,
        upscaler: Arc<dyn Upscaler>,
        frames: &FrameSequence,
        out_dir: &Path,
        progress: &dyn ProgressObserver,
    ) -> Result<FrameTally, PipelineError> {
        let total = frames.len();
        let aborted = Arc::new(AtomicBool::new(false));

        let jobs: Vec<(PathBuf, PathBuf)> = frames
            .iter()
            .map(|frame| (frame.path(), frame.path_in(out_dir)))
            .collect();

        let stop = aborted.clone();
        let tasks = jobs.into_iter().map(move |(input, output)| {
            let upscaler = upscaler.clone();
            let aborted = stop.clone();
            async move {
                if aborted.load(Ordering::SeqCst) {
                    return None;
                }
                Some(tokio::task::spawn_blocking(move || upscaler.upscale(&input, &output)).await)
            }
        });

        let mut results = stream::iter(tasks).buffer_unordered(self.settings.frame_workers.max(1));
        let mut tally = FrameTally::default();
        let mut failure: Option<PipelineError> = None;

        while let Some(outcome) = results.next().await {
            let error = match outcome {
                None => continue,
                Some(Ok(Ok(method))) => {
                    tally.frames += 1;
                    if method == UpscaleMethod::Fallback {
                        tally.fallback += 1;
                    }
                    progress.on_frame(tally.frames, total);
                    continue;
                }
                Some(Ok(Err(e))) => PipelineError::FrameIo(e),
                Some(Err(join)) => PipelineError::Worker(join.to_string()),
            };
            aborted.store(true, Ordering::SeqCst);
            failure.get_or_insert(error);
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(tally),
        }
    }

    fn output_path(&self, stem: &str, config: &JobConfig) -> Result<PathBuf, ConfigError> {
        let dir = &self.settings.output_dir;
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::UnusableDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(dir.join(format!("{}_upscaled_{}x.mp4", stem, config.scale_factor)))
    }
}

#[cfg(unix)]
fn make_world_readable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)) {
        warn!("Could not make {:?} world-readable: {}", path, e);
    }
}

#[cfg(not(unix))]
fn make_world_readable(_path: &Path) {}
