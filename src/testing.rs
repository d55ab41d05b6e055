//! Test doubles shared by the unit tests.
//!
//! Fake "videos" are small JSON descriptors. The fake media tool writes real
//! PNG frames for them and assembles frames back into a descriptor, so the
//! whole pipeline can run without ffmpeg.

use crate::domain::frames::{frame_name, FrameSequence};
use crate::domain::media::{FrameRate, Resolution, VideoMetadata};
use crate::error::MediaToolError;
use crate::ports::media::{AssembleRequest, MediaTool};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FakeVideo {
    pub width: u32,
    pub height: u32,
    pub frames: usize,
    pub has_audio: bool,
    #[serde(default = "yes")]
    pub has_video: bool,
}

fn yes() -> bool {
    true
}

impl FakeVideo {
    pub fn new(width: u32, height: u32, frames: usize, has_audio: bool) -> Self {
        Self {
            width,
            height,
            frames,
            has_audio,
            has_video: true,
        }
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        std::fs::write(path, serde_json::to_vec(self).unwrap()).unwrap();
        path.to_path_buf()
    }

    pub fn read(path: &Path) -> FakeVideo {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }
}

#[derive(Debug, Default)]
pub struct FakeMediaTool {
    pub extract_calls: AtomicUsize,
    pub assemble_calls: AtomicUsize,
    /// 1-based index of a frame written as garbage bytes.
    pub corrupt_frame: Option<usize>,
    pub fail_assembly: bool,
    /// Panic once frames are on disk, as a crashing dependency would.
    pub panic_after_extract: bool,
    /// Delay before extraction, to keep jobs in flight for concurrency tests.
    pub extract_delay: Option<Duration>,
}

impl FakeMediaTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assembled(&self) -> usize {
        self.assemble_calls.load(Ordering::SeqCst)
    }

    fn failed(message: impl Into<String>) -> MediaToolError {
        MediaToolError::Failed {
            tool: "fake".to_string(),
            code: Some(1),
            stderr: message.into(),
        }
    }

    async fn read_video(path: &Path) -> Result<FakeVideo, MediaToolError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Self::failed(format!("{:?}: {}", path, e)))?;
        serde_json::from_slice(&bytes).map_err(|e| MediaToolError::Metadata(e.to_string()))
    }
}

#[async_trait]
impl MediaTool for FakeMediaTool {
    async fn inspect(&self, path: &Path) -> Result<VideoMetadata, MediaToolError> {
        let video = Self::read_video(path).await?;
        if !video.has_video {
            return Err(MediaToolError::NoVideoStream(path.to_path_buf()));
        }
        let file_size = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        let frame_rate = FrameRate::new(30000, 1001)?;
        Ok(VideoMetadata {
            resolution: Resolution {
                width: video.width,
                height: video.height,
            },
            frame_rate,
            duration: video.frames as f64 / frame_rate.as_f64(),
            file_size,
            codec: "fake".to_string(),
            has_audio: video.has_audio,
        })
    }

    async fn extract_frames(&self, input: &Path, frames_dir: &Path) -> Result<(), MediaToolError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.extract_delay {
            tokio::time::sleep(delay).await;
        }
        let video = Self::read_video(input).await?;
        std::fs::create_dir_all(frames_dir).map_err(|e| Self::failed(e.to_string()))?;

        for index in 1..=video.frames {
            let path = frames_dir.join(frame_name(index));
            if self.corrupt_frame == Some(index) {
                std::fs::write(&path, b"corrupt").map_err(|e| Self::failed(e.to_string()))?;
                continue;
            }
            RgbImage::from_fn(video.width, video.height, |x, y| {
                Rgb([(x % 256) as u8, (y % 256) as u8, (index % 256) as u8])
            })
            .save(&path)
            .map_err(|e| Self::failed(e.to_string()))?;
        }
        if self.panic_after_extract {
            panic!("decoder blew up");
        }
        Ok(())
    }

    async fn assemble(&self, request: AssembleRequest<'_>) -> Result<(), MediaToolError> {
        self.assemble_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_assembly {
            return Err(Self::failed("muxer exploded"));
        }

        let frames =
            FrameSequence::scan(request.frames_dir).map_err(|e| Self::failed(e.to_string()))?;
        let first = frames
            .iter()
            .next()
            .ok_or_else(|| Self::failed("no input frames"))?;
        let (width, height) =
            image::image_dimensions(first.path()).map_err(|e| Self::failed(e.to_string()))?;
        for frame in frames.iter() {
            let dims =
                image::image_dimensions(frame.path()).map_err(|e| Self::failed(e.to_string()))?;
            if dims != (width, height) {
                return Err(Self::failed("frame size changed mid-stream"));
            }
        }

        let source = Self::read_video(request.audio_source).await?;
        let output = FakeVideo::new(width, height, frames.len(), source.has_audio);
        std::fs::write(
            request.output_path,
            serde_json::to_vec(&output).map_err(|e| Self::failed(e.to_string()))?,
        )
        .map_err(|e| Self::failed(e.to_string()))?;
        Ok(())
    }
}
