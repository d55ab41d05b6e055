use crate::domain::jobs::JobId;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extraction and processed-frame directories owned by one job.
///
/// Both directories are removed exactly once, when the value is dropped, on
/// every exit path. Removal failures are logged and never replace the job's
/// own error.
#[derive(Debug)]
pub struct WorkingDirectories {
    extraction: PathBuf,
    processed: PathBuf,
}

impl WorkingDirectories {
    /// `stem` is the input's file stem; the job id keeps concurrent jobs on
    /// the same input name apart.
    pub fn create(temp_root: &Path, stem: &str, job_id: &JobId) -> Result<Self, ConfigError> {
        let base = format!("{}_{}", stem, job_id);
        let dirs = Self {
            extraction: temp_root.join(format!("{}_input", base)),
            processed: temp_root.join(format!("{}_output", base)),
        };

        // From here on, Drop cleans up whatever was created.
        for dir in [&dirs.extraction, &dirs.processed] {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::UnusableDirectory {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(dirs)
    }

    pub fn extraction(&self) -> &Path {
        &self.extraction
    }

    pub fn processed(&self) -> &Path {
        &self.processed
    }
}

impl Drop for WorkingDirectories {
    fn drop(&mut self) {
        for dir in [&self.extraction, &self.processed] {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => debug!("Removed {:?}", dir),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to clean up {:?}: {}", dir, e),
            }
        }
    }
}
