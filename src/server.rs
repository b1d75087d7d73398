use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;

use crate::job::{Job, JobId, JobSpec};
use crate::registry::{JobRegistry, RegistryError};

/// HTTP API over the job registry
pub fn router(registry: Arc<JobRegistry>) -> Router {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/{id}", delete(delete_job))
        .with_state(registry)
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match self {
            RegistryError::Invalid(_) => StatusCode::BAD_REQUEST,
            RegistryError::NotFound => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn list_jobs(State(registry): State<Arc<JobRegistry>>) -> Json<Vec<Job>> {
    Json(registry.list().await)
}

async fn create_job(
    State(registry): State<Arc<JobRegistry>>,
    Json(spec): Json<JobSpec>,
) -> Result<(StatusCode, Json<Job>), RegistryError> {
    let job = registry.create(&spec).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn delete_job(
    State(registry): State<Arc<JobRegistry>>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    let removed = registry.delete(JobId(id)).await?;
    Ok(Json(json!({ "deleted": removed })))
}
