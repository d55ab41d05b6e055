//! Vidscale - Video Upscaling Library
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (media, frames, jobs, upscale)
//! - ports/: Trait definitions (media tool, model, job store)
//! - adapters/: Concrete implementations (ffmpeg, Real-ESRGAN, memory, HTTP)
//! - application/: Pipeline orchestration and the job registry
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use application::{Dispatch, JobRegistry, PipelineOrchestrator};
pub use config::AppConfig;
