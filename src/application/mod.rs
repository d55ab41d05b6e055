//! Application layer - Services that drive jobs through the ports.

pub mod pipeline;
pub mod registry;
pub mod workspace;

pub use pipeline::{NoProgress, PipelineOrchestrator, PipelineSettings, ProgressObserver};
pub use registry::{Dispatch, JobRegistry};
pub use workspace::WorkingDirectories;
