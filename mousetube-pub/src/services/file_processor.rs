//! Per-file processing and deletion tasks
//!
//! A processing task walks one file through its state machine:
//! pending → processing → metadata_extracted → done, with error terminal on
//! any failure. The failure is persisted on the file row (status + detail)
//! and re-raised so the job layer can apply its retry policy.

use crate::db;
use crate::models::{FileRecord, FileStatus};
use crate::services::metadata_extractor::extract_metadata;
use crate::services::path_resolver::link_to_local_path;
use crate::services::repository::RepositoryHandler;
use crate::services::truncate_detail;
use crate::AppState;
use anyhow::{anyhow, Result};
use mousetube_common::Error;
use uuid::Uuid;

/// Process a single file: extract metadata and attach it to its session's
/// deposition.
pub async fn process_file(state: &AppState, file_id: Uuid) -> Result<String> {
    let file = db::files::load_file(&state.db, file_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("File {}", file_id)))?;

    db::files::update_status(&state.db, file.id, FileStatus::Processing, None).await?;

    match run_pipeline(state, file).await {
        Ok(message) => Ok(message),
        Err(e) => {
            let detail = truncate_detail(&e.to_string());
            if let Err(status_err) =
                db::files::update_status(&state.db, file_id, FileStatus::Error, Some(&detail))
                    .await
            {
                tracing::error!(
                    file_id = %file_id,
                    error = %status_err,
                    "Failed to persist error status"
                );
            }
            tracing::error!(file_id = %file_id, error = %e, "File processing failed");
            Err(e)
        }
    }
}

async fn run_pipeline(state: &AppState, file: FileRecord) -> Result<String> {
    let settings = &state.settings;

    let local_path = link_to_local_path(&file.link, &settings.media_root, &settings.temp_root)?;
    let patch = extract_metadata(&file, &local_path)?;
    db::files::apply_metadata_patch(&state.db, file.id, &patch).await?;
    db::files::update_status(&state.db, file.id, FileStatus::MetadataExtracted, None).await?;

    let session_id = file.session_id.ok_or_else(|| {
        Error::InvalidInput("File has no associated recording session".to_string())
    })?;
    let session = db::sessions::load_session(&state.db, session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recording session {}", session_id)))?;

    // Dispatch by the file's repository when one is set; new files default
    // to Zenodo.
    let handler = match file.repository_id {
        Some(repository_id) => {
            let repository = db::repositories::load_repository(&state.db, repository_id)
                .await?
                .ok_or_else(|| anyhow!("Repository {} not found", repository_id))?;
            RepositoryHandler::for_repository(&state.db, settings, &repository)?
        }
        None => RepositoryHandler::for_name(&state.db, settings, "zenodo")?,
    };

    // Re-read the record so the deposition metadata sees the fresh fields
    let file = db::files::load_file(&state.db, file.id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("File {}", file.id)))?;

    // Serialize deposition preparation per session: closes the window in
    // which two first uploads could each create a remote draft.
    let report = {
        let _guard = state.session_locks.acquire(session_id).await;
        handler.prepare_deposition(&session, Some(&file)).await?
    };

    if let Some(failure) = report.failed.iter().find(|f| f.file_id == file.id) {
        return Err(anyhow!("Deposition upload failed: {}", failure.reason));
    }

    db::files::update_status(&state.db, file.id, FileStatus::Done, None).await?;

    Ok(format!(
        "File {} processed; deposition {}",
        file.id, report.deposition_id
    ))
}

/// Delete a file: remove its remote copy when a repository is known, then
/// drop the local record. A file already gone locally is a successful no-op.
pub async fn delete_file(
    state: &AppState,
    file_id: Uuid,
    repository_override: Option<String>,
) -> Result<String> {
    let Some(file) = db::files::load_file(&state.db, file_id).await? else {
        return Ok(format!("File {} already deleted", file_id));
    };

    let handler = match file.repository_id {
        Some(repository_id) => {
            let repository = db::repositories::load_repository(&state.db, repository_id)
                .await?
                .ok_or_else(|| anyhow!("Repository {} not found", repository_id))?;
            Some(RepositoryHandler::for_repository(
                &state.db,
                &state.settings,
                &repository,
            )?)
        }
        None => match repository_override.as_deref() {
            Some(name) => Some(RepositoryHandler::for_name(
                &state.db,
                &state.settings,
                name,
            )?),
            None => None,
        },
    };

    if let Some(handler) = handler {
        let removed = handler.delete_file(&file).await?;
        if removed {
            tracing::info!(file_id = %file_id, "Removed remote copy");
        }
    }

    db::files::delete_file_row(&state.db, file_id).await?;
    Ok(format!("File {} deleted", file_id))
}
