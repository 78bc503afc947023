//! Recording session API handlers
//!
//! GET /sessions/{id}, POST /sessions/{id}/publish

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::files::JobAcceptedResponse;
use crate::error::{ApiError, ApiResult};
use crate::models::{JobKind, JobRecord, SessionRecord};
use crate::{db, services, AppState};

/// POST /sessions/{id}/publish request body (optional)
#[derive(Debug, Default, Deserialize)]
pub struct PublishSessionRequest {
    /// Caller-supplied metadata payload, PUT to the deposition before the
    /// publish action
    pub metadata: Option<serde_json::Value>,
}

/// GET /sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionRecord>> {
    let session = db::sessions::load_session(&state.db, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recording session not found: {}", session_id)))?;
    Ok(Json(session))
}

/// POST /sessions/{id}/publish
///
/// Enqueue the publication finalizer for this session. Returns 202 Accepted
/// with a job id; the job reports progress checkpoints at 20/60/90/100.
pub async fn publish_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    request: Option<Json<PublishSessionRequest>>,
) -> ApiResult<(StatusCode, Json<JobAcceptedResponse>)> {
    // Reject unknown sessions synchronously; deposition preconditions are
    // re-checked inside the job.
    db::sessions::load_session(&state.db, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recording session not found: {}", session_id)))?;

    let job = JobRecord::new(JobKind::PublishSession, session_id);
    db::jobs::create_job(&state.db, &job).await?;

    let extra_metadata = request.and_then(|Json(r)| r.metadata);
    let task_state = state.clone();
    services::jobs::spawn_job(state.db.clone(), job.id, move |handle| {
        let task_state = task_state.clone();
        let extra_metadata = extra_metadata.clone();
        async move {
            let outcome = services::finalizer::publish_session_deposition(
                &task_state.db,
                &task_state.settings,
                session_id,
                extra_metadata,
                &handle,
            )
            .await?;
            Ok(format!(
                "Session published with DOI {} (deposition {})",
                outcome.doi, outcome.deposition_id
            ))
        }
    });

    tracing::info!(session_id = %session_id, job_id = %job.id, "Publication job enqueued");
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedResponse {
            job_id: job.id,
            state: job.state,
        }),
    ))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:session_id", get(get_session))
        .route("/sessions/:session_id/publish", post(publish_session))
}
