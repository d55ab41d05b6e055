//! Error taxonomy for the upscaling pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid configuration or unusable storage areas.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scale factor {0}: must be at least 1")]
    InvalidScale(i64),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("directory {path:?} is not usable: {source}")]
    UnusableDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure reported by the external media tool.
#[derive(Debug, Error)]
pub enum MediaToolError {
    #[error("could not run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {}: {stderr}", exit_label(.code))]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("cannot prepare frames directory {path:?}: {source}")]
    FramesDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unparseable metadata: {0}")]
    Metadata(String),

    #[error("no video stream found in {0:?}")]
    NoVideoStream(PathBuf),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// The model artifact could not be loaded. Never fatal: the upscaler degrades.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model artifact not found at {0:?}")]
    NotFound(PathBuf),

    #[error("inference runtime unavailable: {0}")]
    Runtime(String),
}

/// A single inference call failed.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference process failed: {0}")]
    Process(String),

    #[error("inference I/O: {0}")]
    Io(#[from] io::Error),

    #[error("inference output unreadable: {0}")]
    Output(#[from] image::ImageError),
}

/// Frame-level I/O. Fatal for the job that hits it.
#[derive(Debug, Error)]
pub enum FrameIoError {
    #[error("frame I/O error: could not decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame I/O error: could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("frame I/O error: could not encode {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame I/O error: could not write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("frame I/O error: a {width}x{height} frame cannot be scaled {scale}x")]
    Oversize { width: u32, height: u32, scale: u32 },

    #[error("frame I/O error: no frames extracted from {0:?}")]
    NoFrames(PathBuf),

    #[error("frame I/O error: extracted {extracted} frames but processed {processed}")]
    CountMismatch { extracted: usize, processed: usize },
}

/// Fatal outcome of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("media tool error: {0}")]
    MediaTool(#[from] MediaToolError),

    #[error(transparent)]
    FrameIo(#[from] FrameIoError),

    #[error("assembly failed: {0}")]
    Assembly(#[source] MediaToolError),

    #[error("frame worker crashed: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} is not in the store")]
    Missing(String),

    #[error("job {0} already exists")]
    Duplicate(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
