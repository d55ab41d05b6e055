//! CLI Binary - Upscale one video in the foreground.
//!
//! Usage: `vidscale-cli <video>`

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use vidscale::adapters::local::{local_pipeline, MemoryJobStore};
use vidscale::application::ProgressObserver;
use vidscale::domain::jobs::JobStatus;
use vidscale::{AppConfig, Dispatch, JobRegistry};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Per-frame progress bar on stderr.
struct FrameBar(ProgressBar);

impl FrameBar {
    fn new() -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} frames | ETA: {eta}",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self(bar)
    }
}

impl ProgressObserver for FrameBar {
    fn on_frame(&self, done: usize, total: usize) {
        self.0.set_length(total as u64);
        self.0.set_position(done as u64);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let Some(input) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: vidscale-cli <video>");
        return ExitCode::FAILURE;
    };
    if !input.is_file() {
        eprintln!("Error: file not found: {}", input.display());
        return ExitCode::FAILURE;
    }

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.ensure_dirs() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let bar = Arc::new(FrameBar::new());
    let registry = JobRegistry::new(
        MemoryJobStore::new(),
        Arc::new(local_pipeline(&config)),
        1,
    )
    .with_observer(bar.clone());
    let record = match registry
        .submit(input, config.job_defaults, Dispatch::Inline)
        .await
    {
        Ok(id) => registry.get_status(&id).await,
        Err(e) => Err(e),
    };
    bar.0.finish_and_clear();

    match record {
        Ok(record) if record.status == JobStatus::Completed => {
            let Some(result) = record.result else {
                eprintln!("Error: job completed without a result");
                return ExitCode::FAILURE;
            };
            println!("Upscaling complete");
            println!("Output: {}", result.output_path.display());
            println!("New resolution: {}", result.new_resolution);
            println!("Processing time: {:.2}s", result.process_duration_sec);
            println!("Size: {:.2} MB", result.filesize as f64 / BYTES_PER_MB);
            if result.fallback_frames > 0 {
                println!(
                    "Fallback used for {} of {} frames",
                    result.fallback_frames, result.frames
                );
            }
            ExitCode::SUCCESS
        }
        Ok(record) => {
            eprintln!(
                "Error: {}",
                record.error.unwrap_or_else(|| format!("job ended {:?}", record.status))
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
