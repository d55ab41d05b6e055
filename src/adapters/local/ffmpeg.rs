//! `MediaTool` backed by the ffmpeg and ffprobe executables.

use crate::domain::frames::frame_pattern;
use crate::domain::media::{FrameRate, Resolution, VideoMetadata};
use crate::error::MediaToolError;
use crate::ports::media::{AssembleRequest, MediaTool};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegTool {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn run(&self, program: &Path, args: Vec<OsString>) -> Result<Output, MediaToolError> {
        let tool = program.to_string_lossy().to_string();
        debug!("Running {} {:?}", tool, args);

        let output = Command::new(program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MediaToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaToolError::Failed {
                tool,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn inspect(&self, path: &Path) -> Result<VideoMetadata, MediaToolError> {
        let output = self.run(&self.ffprobe, metadata_args(path)).await?;
        parse_metadata(&output.stdout, path)
    }

    async fn extract_frames(&self, input: &Path, frames_dir: &Path) -> Result<(), MediaToolError> {
        tokio::fs::create_dir_all(frames_dir)
            .await
            .map_err(|source| MediaToolError::FramesDir {
                path: frames_dir.to_path_buf(),
                source,
            })?;
        self.run(&self.ffmpeg, extract_args(input, frames_dir)).await?;
        Ok(())
    }

    async fn assemble(&self, request: AssembleRequest<'_>) -> Result<(), MediaToolError> {
        self.run(&self.ffmpeg, assemble_args(&request)).await?;
        Ok(())
    }
}

fn metadata_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(path.into());
    args
}

fn extract_args(input: &Path, frames_dir: &Path) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.into(),
        "-vsync".into(),
        "0".into(),
        frames_dir.join(frame_pattern()).into(),
    ]
}

fn assemble_args(request: &AssembleRequest<'_>) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-framerate".into(),
        request.frame_rate.to_string().into(),
        "-i".into(),
        request.frames_dir.join(frame_pattern()).into(),
        "-i".into(),
        request.audio_source.into(),
        "-c:v".into(),
        request.video_codec.into(),
        "-pix_fmt".into(),
        request.pixel_format.into(),
        "-c:a".into(),
        "copy".into(),
        "-map".into(),
        "0:v:0".into(),
        // Trailing `?` makes the audio mapping optional.
        "-map".into(),
        "1:a:0?".into(),
        "-shortest".into(),
        request.output_path.into(),
    ]
}

#[derive(Debug, Deserialize)]
struct MetadataOutput {
    #[serde(default)]
    streams: Vec<StreamEntry>,
    format: Option<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    duration: Option<String>,
    size: Option<String>,
}

fn parse_metadata(stdout: &[u8], path: &Path) -> Result<VideoMetadata, MediaToolError> {
    let parsed: MetadataOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaToolError::Metadata(format!("ffprobe output: {}", e)))?;

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaToolError::NoVideoStream(path.to_path_buf()))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MediaToolError::Metadata(
                "video stream has no dimensions".to_string(),
            ))
        }
    };

    // avg_frame_rate is "0/0" for some containers; r_frame_rate is the fallback.
    let frame_rate = video
        .avg_frame_rate
        .as_deref()
        .and_then(|r| r.parse::<FrameRate>().ok())
        .map(Ok)
        .unwrap_or_else(|| {
            video
                .r_frame_rate
                .as_deref()
                .unwrap_or_default()
                .parse::<FrameRate>()
        })?;

    let format = parsed.format.as_ref();
    let duration = format
        .and_then(|f| f.duration.as_deref())
        .map(|d| d.parse::<f64>())
        .transpose()
        .map_err(|e| MediaToolError::Metadata(format!("duration: {}", e)))?
        .unwrap_or(0.0);
    let file_size = format
        .and_then(|f| f.size.as_deref())
        .map(|s| s.parse::<u64>())
        .transpose()
        .map_err(|e| MediaToolError::Metadata(format!("size: {}", e)))?
        .unwrap_or(0);

    Ok(VideoMetadata {
        resolution: Resolution { width, height },
        frame_rate,
        duration,
        file_size,
        codec: video.codec_name.clone().unwrap_or_default(),
        has_audio,
    })
}
