use crate::domain::media::{FrameRate, VideoMetadata};
use crate::error::MediaToolError;
use async_trait::async_trait;
use std::path::Path;

/// Inputs to muxing processed frames back into a video.
#[derive(Debug, Clone, Copy)]
pub struct AssembleRequest<'a> {
    pub frames_dir: &'a Path,
    /// Original video; its first audio stream is copied when present.
    pub audio_source: &'a Path,
    pub output_path: &'a Path,
    pub frame_rate: FrameRate,
    pub video_codec: &'a str,
    pub pixel_format: &'a str,
}

/// External tool that inspects, splits and reassembles videos.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Fails when the file has no decodable video stream.
    async fn inspect(&self, path: &Path) -> Result<VideoMetadata, MediaToolError>;

    /// Writes sequentially numbered frames (see `domain::frames`) into `frames_dir`.
    async fn extract_frames(&self, input: &Path, frames_dir: &Path) -> Result<(), MediaToolError>;

    /// A missing audio stream in the source must not fail assembly.
    async fn assemble(&self, request: AssembleRequest<'_>) -> Result<(), MediaToolError>;
}
