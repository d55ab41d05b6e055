use super::media::Resolution;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Integer multiplier applied to both dimensions. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct ScaleFactor(u32);

impl ScaleFactor {
    pub fn new(factor: i64) -> Result<Self, ConfigError> {
        if factor < 1 || factor > u32::MAX as i64 {
            return Err(ConfigError::InvalidScale(factor));
        }
        Ok(Self(factor as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<i64> for ScaleFactor {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        ScaleFactor::new(value)
    }
}

impl From<ScaleFactor> for u32 {
    fn from(value: ScaleFactor) -> Self {
        value.0
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-job request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub scale_factor: ScaleFactor,
    pub use_ai: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            scale_factor: ScaleFactor::default(),
            use_ai: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscaleResult {
    pub output_path: PathBuf,
    pub original_resolution: Resolution,
    pub new_resolution: Resolution,
    /// Wall time in seconds.
    pub process_duration_sec: f64,
    pub filesize: u64,
    pub frames: usize,
    /// Frames where the model failed and the deterministic resize was used.
    pub fallback_frames: usize,
    pub model_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameProgress {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal job transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// Tracked state of one submitted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub input_path: PathBuf,
    pub config: JobConfig,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<FrameProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<UpscaleResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn queued(id: JobId, input_path: PathBuf, config: JobConfig) -> Self {
        Self {
            id,
            input_path,
            config,
            status: JobStatus::Queued,
            progress: None,
            result: None,
            error: None,
        }
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Processing)
    }

    pub fn complete(&mut self, result: UpscaleResult) -> Result<(), TransitionError> {
        self.transition(JobStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TransitionError> {
        let allowed = match (self.status, to) {
            (JobStatus::Queued, JobStatus::Processing) => true,
            // A job may fail before it ever starts processing.
            (JobStatus::Queued, JobStatus::Failed) => true,
            (JobStatus::Processing, JobStatus::Completed | JobStatus::Failed) => true,
            _ => false,
        };
        if !allowed {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
