//! HTTP inbound adapter for served mode.
//!
//! - `POST /upscale`: multipart upload, returns a job id immediately
//! - `GET /status/:id`: job snapshot
//! - `GET /`: gallery of finished videos, served under `/outputs`

mod gallery;
mod status;
mod upload;

use crate::application::JobRegistry;
use crate::domain::jobs::JobConfig;
use crate::ports::repository::JobStore;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState<S> {
    pub registry: JobRegistry<S>,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Applied when a request leaves scale or use_ai out.
    pub defaults: JobConfig,
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: JobStore + Clone + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(gallery::index::<S>))
        .route("/upscale", post(upload::upscale::<S>))
        .route("/status/:id", get(status::get_status::<S>))
        .nest_service("/outputs", ServeDir::new(&state.output_dir))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .with_state(state)
}

/// Error body: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
