use super::{ApiError, AppState};
use crate::application::Dispatch;
use crate::domain::jobs::{JobConfig, JobId, JobStatus, ScaleFactor};
use crate::ports::repository::JobStore;
use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    BoxError, Json,
};
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::{fs::File, io::AsyncWriteExt, io::BufWriter};
use tokio_util::io::StreamReader;
use tracing::{error, info};

const FILE_FIELD: &str = "file";
const DEFAULT_EXTENSION: &str = "mp4";
/// Largest scale a client may request.
pub const MAX_REQUEST_SCALE: i64 = 8;

#[derive(Debug, Default, Deserialize)]
pub struct UpscaleParams {
    scale: Option<String>,
    use_ai: Option<String>,
}

impl UpscaleParams {
    fn job_config(&self, defaults: JobConfig) -> Result<JobConfig, ApiError> {
        let scale_factor = match self.scale.as_deref() {
            None => defaults.scale_factor,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::bad_request(format!("Invalid scale: {:?}", raw)))
                .and_then(|s| {
                    if s > MAX_REQUEST_SCALE {
                        return Err(ApiError::bad_request(format!(
                            "scale {} exceeds the maximum of {}",
                            s, MAX_REQUEST_SCALE
                        )));
                    }
                    ScaleFactor::new(s).map_err(|e| ApiError::bad_request(e.to_string()))
                })?,
        };
        let use_ai = match self.use_ai.as_deref() {
            None => defaults.use_ai,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(ApiError::bad_request(format!("Invalid use_ai: {:?}", raw))),
            },
        };
        Ok(JobConfig {
            scale_factor,
            use_ai,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub task_id: JobId,
    pub status: JobStatus,
}

/// Saves the uploaded video under a fresh name and submits it. Responds as
/// soon as the job is queued.
pub async fn upscale<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<UpscaleParams>,
    mut multipart: Multipart,
) -> Result<Json<Accepted>, ApiError>
where
    S: JobStore + Clone + 'static,
{
    let config = params.job_config(state.defaults)?;

    let mut saved: Option<PathBuf> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let extension = upload_extension(field.file_name());
        let path = state
            .upload_dir
            .join(format!("{}.{}", uuid::Uuid::new_v4(), extension));
        if !path_is_valid(&path) {
            return Err(ApiError::bad_request("Invalid path"));
        }

        info!("Saving upload {:?} to {:?}", field.file_name(), path);
        if let Err(e) = stream_to_file(&path, field).await {
            let _ = tokio::fs::remove_file(&path).await;
            error!("Failed to save upload to {:?}: {}", path, e);
            return Err(ApiError::internal(e.to_string()));
        }
        saved = Some(path);
        break;
    }

    let input = saved.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let task_id = match state
        .registry
        .submit(input.clone(), config, Dispatch::Detached)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!("Could not queue {:?}: {}", input, e);
            let _ = tokio::fs::remove_file(&input).await;
            return Err(ApiError::internal(e.to_string()));
        }
    };

    Ok(Json(Accepted {
        task_id,
        status: JobStatus::Queued,
    }))
}

/// Keeps the client's extension only when it is short and alphanumeric.
fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

// Save a `Stream` to a file
async fn stream_to_file<S, E>(path: &Path, stream: S) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::new(File::create(path).await?);
    let written = tokio::io::copy(&mut body_reader, &mut file).await?;
    file.flush().await?;
    Ok(written)
}

fn path_is_valid(path: &Path) -> bool {
    !path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}
