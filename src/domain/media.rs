use crate::error::MediaToolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame rate as an exact rational, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Result<Self, MediaToolError> {
        if num == 0 || den == 0 {
            return Err(MediaToolError::Metadata(format!(
                "invalid frame rate {}/{}",
                num, den
            )));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for FrameRate {
    type Err = MediaToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MediaToolError::Metadata(format!("invalid frame rate {:?}", s));
        match s.trim().split_once('/') {
            Some((num, den)) => {
                let num = num.trim().parse().map_err(|_| invalid())?;
                let den = den.trim().parse().map_err(|_| invalid())?;
                FrameRate::new(num, den)
            }
            None => FrameRate::new(s.trim().parse().map_err(|_| invalid())?, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// `None` when either side overflows `u32`.
    pub fn scaled(&self, factor: u32) -> Option<Resolution> {
        Some(Resolution {
            width: self.width.checked_mul(factor)?,
            height: self.height.checked_mul(factor)?,
        })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Result of probing a media file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub resolution: Resolution,
    pub frame_rate: FrameRate,
    /// Seconds.
    pub duration: f64,
    /// Bytes.
    pub file_size: u64,
    pub codec: String,
    pub has_audio: bool,
}
