//! Server Binary - Upload videos over HTTP and poll their status.
//!
//! Wires up:
//! - Local adapters (ffmpeg, Real-ESRGAN, in-memory job store)
//! - The job registry with bounded concurrency
//! - HTTP inbound adapter

use std::sync::Arc;
use vidscale::adapters::local::{local_pipeline, router, AppState, MemoryJobStore};
use vidscale::{AppConfig, JobRegistry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.ensure_dirs() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // 1. Application services
    let pipeline = Arc::new(local_pipeline(&config));
    let registry = JobRegistry::new(MemoryJobStore::new(), pipeline, config.max_concurrent_jobs);
    tracing::info!(
        "Up to {} concurrent jobs, {} frame workers each",
        config.max_concurrent_jobs,
        config.frame_workers
    );

    // 2. HTTP layer
    let app = router(AppState {
        registry,
        upload_dir: config.upload_dir.clone(),
        output_dir: config.output_dir.clone(),
        defaults: config.job_defaults,
    });

    // 3. Start server
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    tracing::info!("Listening at {}:{}", config.addr, config.port);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
