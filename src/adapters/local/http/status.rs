use super::{ApiError, AppState};
use crate::domain::jobs::{JobId, JobRecord};
use crate::error::RegistryError;
use crate::ports::repository::JobStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

pub async fn get_status<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError>
where
    S: JobStore + Clone + 'static,
{
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, "Task not found");
    let id: JobId = id.parse().map_err(|_| not_found())?;

    match state.registry.get_status(&id).await {
        Ok(record) => Ok(Json(record)),
        Err(RegistryError::NotFound(_)) => Err(not_found()),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}
