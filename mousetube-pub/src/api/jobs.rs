//! Job status polling endpoint

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::JobRecord;
use crate::{db, AppState};

/// GET /jobs/{id}
///
/// Poll a background job: coarse state, 0-100 progress, completion message.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    let job = db::jobs::load_job(&state.db, job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))?;
    Ok(Json(job))
}

pub fn job_routes() -> Router<AppState> {
    Router::new().route("/jobs/:job_id", get(get_job))
}
