//! Background job persistence
//!
//! Jobs communicate with the web layer exclusively through these rows:
//! a worker writes state/progress here, clients poll `GET /jobs/{id}`.

use crate::models::{JobKind, JobRecord, JobState};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn map_job_row(row: &sqlx::sqlite::SqliteRow) -> Result<JobRecord> {
    let id: String = row.get("id");
    let kind: String = row.get("kind");
    let target_id: String = row.get("target_id");
    let state: String = row.get("state");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(JobRecord {
        id: Uuid::parse_str(&id)?,
        kind: JobKind::parse(&kind).ok_or_else(|| anyhow!("Unknown job kind: {}", kind))?,
        target_id: Uuid::parse_str(&target_id)?,
        state: JobState::parse(&state).ok_or_else(|| anyhow!("Unknown job state: {}", state))?,
        progress: row.get("progress"),
        message: row.get("message"),
        attempts: row.get("attempts"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

// SQLite CURRENT_TIMESTAMP produces "YYYY-MM-DD HH:MM:SS" (UTC, no zone)
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Insert a queued job row
pub async fn create_job(pool: &SqlitePool, job: &JobRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO jobs (id, kind, target_id, state, progress, message, attempts)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job.id.to_string())
    .bind(job.kind.as_str())
    .bind(job.target_id.to_string())
    .bind(job.state.as_str())
    .bind(job.progress)
    .bind(&job.message)
    .bind(job.attempts)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a job by id
pub async fn load_job(pool: &SqlitePool, id: Uuid) -> Result<Option<JobRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, kind, target_id, state, progress, message, attempts, created_at, updated_at
        FROM jobs
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_job_row).transpose()
}

/// Mark a job started and count the attempt
pub async fn mark_attempt_started(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET state = 'started', attempts = attempts + 1, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record progress (0-100) and a human-readable checkpoint message
pub async fn update_progress(
    pool: &SqlitePool,
    id: Uuid,
    progress: i64,
    message: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET progress = ?, message = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(progress.clamp(0, 100))
    .bind(message)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Finish a job in a terminal state
pub async fn finish_job(
    pool: &SqlitePool,
    id: Uuid,
    state: JobState,
    message: &str,
) -> Result<()> {
    let progress = if state == JobState::Success { 100 } else { -1 };
    let mut query: sqlx::QueryBuilder<sqlx::Sqlite> =
        sqlx::QueryBuilder::new("UPDATE jobs SET state = ");
    query.push_bind(state.as_str());
    if progress >= 0 {
        query.push(", progress = ").push_bind(progress);
    }
    query
        .push(", message = ")
        .push_bind(message)
        .push(", updated_at = CURRENT_TIMESTAMP WHERE id = ")
        .push_bind(id.to_string());

    query.build().execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        mousetube_common::db::create_all_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn job_lifecycle_round_trip() {
        let pool = test_pool().await;

        let job = JobRecord::new(JobKind::PublishSession, Uuid::new_v4());
        create_job(&pool, &job).await.unwrap();

        mark_attempt_started(&pool, job.id).await.unwrap();
        update_progress(&pool, job.id, 60, "deposition published").await.unwrap();
        finish_job(&pool, job.id, JobState::Success, "session published").await.unwrap();

        let loaded = load_job(&pool, job.id).await.unwrap().unwrap();
        assert_eq!(loaded.state, JobState::Success);
        assert_eq!(loaded.progress, 100);
        assert_eq!(loaded.attempts, 1);
        assert_eq!(loaded.message.as_deref(), Some("session published"));
    }

    #[tokio::test]
    async fn failure_keeps_last_progress() {
        let pool = test_pool().await;

        let job = JobRecord::new(JobKind::ProcessFile, Uuid::new_v4());
        create_job(&pool, &job).await.unwrap();
        mark_attempt_started(&pool, job.id).await.unwrap();
        update_progress(&pool, job.id, 20, "preconditions ok").await.unwrap();
        finish_job(&pool, job.id, JobState::Failure, "remote error").await.unwrap();

        let loaded = load_job(&pool, job.id).await.unwrap().unwrap();
        assert_eq!(loaded.state, JobState::Failure);
        assert_eq!(loaded.progress, 20);
    }
}
