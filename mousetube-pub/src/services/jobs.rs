//! Background job runner
//!
//! Jobs run as spawned tasks and communicate with the web layer only
//! through their row in the jobs table: coarse state, 0-100 progress, and a
//! completion message. A failed attempt is retried once after a fixed
//! backoff before the job is marked failed.

use crate::db;
use crate::models::JobState;
use crate::services::truncate_detail;
use sqlx::SqlitePool;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Retry budget: one retry after the first failed attempt
pub const DEFAULT_MAX_RETRIES: u32 = 1;
/// Fixed delay before the retry attempt
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Progress reporter handed to a running job body
#[derive(Clone)]
pub struct JobHandle {
    db: SqlitePool,
    job_id: Uuid,
}

impl JobHandle {
    pub fn new(db: SqlitePool, job_id: Uuid) -> Self {
        Self { db, job_id }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Record a progress checkpoint. Progress failures are logged, not
    /// propagated: they must not fail the job itself.
    pub async fn progress(&self, percent: i64, message: &str) {
        if let Err(e) = db::jobs::update_progress(&self.db, self.job_id, percent, message).await {
            tracing::warn!(
                job_id = %self.job_id,
                error = %e,
                "Failed to record job progress"
            );
        }
    }
}

/// Spawn a background job with the default retry policy.
pub fn spawn_job<F, Fut>(db: SqlitePool, job_id: Uuid, run: F) -> tokio::task::JoinHandle<()>
where
    F: Fn(JobHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    spawn_job_with_policy(db, job_id, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF, run)
}

/// Spawn a background job with an explicit retry budget and backoff.
pub fn spawn_job_with_policy<F, Fut>(
    db: SqlitePool,
    job_id: Uuid,
    max_retries: u32,
    backoff: Duration,
    run: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn(JobHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            if let Err(e) = db::jobs::mark_attempt_started(&db, job_id).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job started");
            }

            let handle = JobHandle::new(db.clone(), job_id);
            match run(handle).await {
                Ok(message) => {
                    if let Err(e) =
                        db::jobs::finish_job(&db, job_id, JobState::Success, &message).await
                    {
                        tracing::error!(job_id = %job_id, error = %e, "Failed to finish job");
                    }
                    tracing::info!(job_id = %job_id, attempt, "Job succeeded");
                    break;
                }
                Err(e) if attempt <= max_retries => {
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        error = %e,
                        "Job attempt failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    let detail = truncate_detail(&format!("{:#}", e));
                    if let Err(finish_err) =
                        db::jobs::finish_job(&db, job_id, JobState::Failure, &detail).await
                    {
                        tracing::error!(
                            job_id = %job_id,
                            error = %finish_err,
                            "Failed to record job failure"
                        );
                    }
                    tracing::error!(job_id = %job_id, attempt, error = %e, "Job failed");
                    break;
                }
            }
        }
    })
}
