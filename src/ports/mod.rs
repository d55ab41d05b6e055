//! Capability traits the application layer depends on.

pub mod media;
pub mod model;
pub mod repository;
