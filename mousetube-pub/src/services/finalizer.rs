//! Publication finalizer
//!
//! Publishes a session's deposition, stamps the minted DOI onto the
//! session's files, and cascades the validated status across every entity
//! the session references. Runs as a long job reporting discrete progress
//! checkpoints (20/60/90/100) for client polling.

use crate::db;
use crate::db::validation::ValidationSummary;
use crate::models::SessionStatus;
use crate::services::jobs::JobHandle;
use crate::services::repository::RepositoryHandler;
use crate::services::zenodo::adapter::sanitize_filename;
use anyhow::{anyhow, Result};
use mousetube_common::{Error, Settings};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Result of a completed publication
#[derive(Debug)]
pub struct PublishOutcome {
    pub deposition_id: String,
    pub doi: String,
    pub files_stamped: u64,
    pub valid_links: u64,
    pub summary: ValidationSummary,
}

/// Publish the deposition of a recording session.
///
/// Preconditions: the session exists, has at least one file, and at least
/// one file already carries a deposition identifier. Both failures are
/// reported as invalid input before any remote call is made.
pub async fn publish_session_deposition(
    pool: &SqlitePool,
    settings: &Settings,
    session_id: Uuid,
    extra_metadata: Option<serde_json::Value>,
    job: &JobHandle,
) -> Result<PublishOutcome> {
    let session = db::sessions::load_session(pool, session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recording session {}", session_id)))?;

    let files = db::files::files_for_session(pool, session_id).await?;
    if files.is_empty() {
        return Err(Error::InvalidInput(
            "Recording session has no associated files".to_string(),
        )
        .into());
    }

    let repository_id = files
        .iter()
        .find(|f| f.external_id.is_some() && f.repository_id.is_some())
        .and_then(|f| f.repository_id)
        .ok_or_else(|| {
            Error::InvalidInput(
                "No deposition has been prepared for this session yet".to_string(),
            )
        })?;

    job.progress(20, "Preconditions verified").await;

    let repository = db::repositories::load_repository(pool, repository_id)
        .await?
        .ok_or_else(|| anyhow!("Repository {} not found", repository_id))?;
    let handler = RepositoryHandler::for_repository(pool, settings, &repository)?;

    let published = handler
        .publish_deposition(&session, extra_metadata.as_ref())
        .await?;

    job.progress(60, "Deposition published").await;

    // Stamp DOI-less files tied to this deposition with the minted DOI and
    // their public links; files that already carry a foreign DOI only lose
    // their repository reference when their link points elsewhere.
    let records_base = handler.records_base();
    let external_url = format!("{}/records/{}", records_base, published.deposition_id);
    let mut files_stamped = 0;
    for file in &files {
        if file.external_id.as_deref() != Some(published.deposition_id.as_str()) {
            continue;
        }
        if file.doi.is_some() {
            continue;
        }
        let link = format!(
            "{}/records/{}/files/{}?download=1",
            records_base,
            published.deposition_id,
            sanitize_filename(&file.name)
        );
        if db::files::stamp_publication(pool, file.id, &published.doi, &link, &external_url)
            .await?
        {
            files_stamped += 1;
        }
    }
    db::files::detach_foreign_repositories(pool, session_id, &records_base).await?;

    let summary = db::validation::cascade_session_validation(pool, &session).await?;
    db::sessions::update_session_status(pool, session_id, SessionStatus::Published).await?;

    job.progress(90, "Validation cascade complete").await;

    let valid_links = db::files::mark_valid_links(pool, session_id).await?;

    job.progress(100, "Session published").await;

    tracing::info!(
        session_id = %session_id,
        deposition_id = %published.deposition_id,
        doi = %published.doi,
        files_stamped,
        valid_links,
        "Recording session published"
    );

    Ok(PublishOutcome {
        deposition_id: published.deposition_id,
        doi: published.doi,
        files_stamped,
        valid_links,
        summary,
    })
}
