//! File API handlers
//!
//! POST /files, GET /files/{id}, POST /files/{id}/process,
//! DELETE /files/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{FileRecord, JobKind, JobRecord, JobState};
use crate::{db, services, AppState};

/// POST /files request
#[derive(Debug, Deserialize)]
pub struct RegisterFileRequest {
    pub name: String,
    pub link: String,
    pub session_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Response for job-enqueuing endpoints (202 Accepted)
#[derive(Debug, Serialize)]
pub struct JobAcceptedResponse {
    pub job_id: Uuid,
    pub state: JobState,
}

/// DELETE /files/{id} query parameters
#[derive(Debug, Deserialize)]
pub struct DeleteFileQuery {
    /// Repository name override for files with no repository assigned
    pub repository: Option<String>,
}

/// POST /files
///
/// Register an uploaded file record in pending state.
pub async fn register_file(
    State(state): State<AppState>,
    Json(request): Json<RegisterFileRequest>,
) -> ApiResult<(StatusCode, Json<FileRecord>)> {
    if request.link.trim().is_empty() {
        return Err(ApiError::BadRequest("File link is empty".to_string()));
    }

    let mut file = FileRecord::new(request.name, request.link, request.session_id);
    file.created_by = request.created_by;

    db::files::create_file(&state.db, &file).await?;

    tracing::info!(file_id = %file.id, link = %file.link, "File registered");
    Ok((StatusCode::CREATED, Json(file)))
}

/// GET /files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> ApiResult<Json<FileRecord>> {
    let file = db::files::load_file(&state.db, file_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("File not found: {}", file_id)))?;
    Ok(Json(file))
}

/// POST /files/{id}/process
///
/// Enqueue the per-file processing task. Returns 202 Accepted with a job id
/// to poll.
pub async fn process_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<JobAcceptedResponse>)> {
    let file = db::files::load_file(&state.db, file_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("File not found: {}", file_id)))?;

    let job = JobRecord::new(JobKind::ProcessFile, file.id);
    db::jobs::create_job(&state.db, &job).await?;

    let task_state = state.clone();
    services::jobs::spawn_job(state.db.clone(), job.id, move |_handle| {
        let task_state = task_state.clone();
        async move { services::file_processor::process_file(&task_state, file_id).await }
    });

    tracing::info!(file_id = %file_id, job_id = %job.id, "File processing job enqueued");
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedResponse {
            job_id: job.id,
            state: job.state,
        }),
    ))
}

/// DELETE /files/{id}
///
/// Enqueue the deletion task: remote copy removal (when a repository is
/// known) followed by local record removal.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<DeleteFileQuery>,
) -> ApiResult<(StatusCode, Json<JobAcceptedResponse>)> {
    let job = JobRecord::new(JobKind::DeleteFile, file_id);
    db::jobs::create_job(&state.db, &job).await?;

    let task_state = state.clone();
    let repository_override = query.repository;
    services::jobs::spawn_job(state.db.clone(), job.id, move |_handle| {
        let task_state = task_state.clone();
        let repository_override = repository_override.clone();
        async move {
            services::file_processor::delete_file(&task_state, file_id, repository_override).await
        }
    });

    tracing::info!(file_id = %file_id, job_id = %job.id, "File deletion job enqueued");
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedResponse {
            job_id: job.id,
            state: job.state,
        }),
    ))
}

pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", post(register_file))
        .route("/files/:file_id", get(get_file).delete(delete_file))
        .route("/files/:file_id/process", post(process_file))
}
