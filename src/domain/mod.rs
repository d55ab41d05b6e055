//! Domain layer - Pure business logic.

pub mod frames;
pub mod jobs;
pub mod media;
pub mod upscale;
