//! Deposition builder and publication operations for Zenodo
//!
//! Builds a session's draft deposition incrementally as files arrive:
//! uploads the eligible files that are not yet attached, tags each with the
//! deposition identifier, cleans up staging copies, and keeps the remote
//! descriptive metadata current. A failure on one file never aborts the
//! batch; draft-creation and metadata failures abort the whole operation.

use crate::db;
use crate::models::{Creator, FileRecord, FileStatus, SessionContext, SessionRecord};
use crate::services::path_resolver::link_to_local_path;
use crate::services::truncate_detail;
use crate::services::zenodo::client::{ZenodoClient, ZenodoError};
use anyhow::{anyhow, Context, Result};
use mousetube_common::{Error, Settings};
use sqlx::SqlitePool;
use std::path::PathBuf;
use uuid::Uuid;

/// Outcome of one deposition-preparation call
#[derive(Debug, Clone)]
pub struct DepositionReport {
    pub deposition_id: String,
    /// Files uploaded and tagged by this call
    pub uploaded: Vec<Uuid>,
    /// Files skipped with their individual failure reasons
    pub failed: Vec<FileFailure>,
}

/// A per-file failure inside a deposition batch
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub file_id: Uuid,
    pub reason: String,
}

/// A published deposition with its minted identifier
#[derive(Debug, Clone)]
pub struct PublishedDeposition {
    pub deposition_id: String,
    pub doi: String,
}

/// Zenodo adapter: deposition builder, publisher, and remote file removal
pub struct ZenodoAdapter {
    db: SqlitePool,
    client: ZenodoClient,
    media_root: PathBuf,
    temp_root: PathBuf,
}

impl ZenodoAdapter {
    pub fn new(db: SqlitePool, settings: &Settings) -> Result<Self, ZenodoError> {
        let client = ZenodoClient::new(&settings.zenodo_api, &settings.zenodo_token)?;
        Ok(Self {
            db,
            client,
            media_root: settings.media_root.clone(),
            temp_root: settings.temp_root.clone(),
        })
    }

    /// Public record base URL of this Zenodo instance
    pub fn records_base(&self) -> String {
        self.client.records_base()
    }

    /// JSON-schema description of the metadata fields Zenodo accepts,
    /// served to clients for form generation.
    pub fn metadata_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Zenodo deposition metadata",
            "type": "object",
            "required": ["title", "upload_type", "description", "creators"],
            "properties": {
                "title": { "type": "string" },
                "upload_type": { "type": "string", "enum": ["dataset"] },
                "description": { "type": "string" },
                "creators": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "name": { "type": "string", "description": "Family, Given" },
                            "affiliation": { "type": "string" },
                            "orcid": { "type": "string" }
                        }
                    }
                },
                "communities": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "identifier": { "type": "string" } }
                    }
                }
            }
        })
    }

    /// Build the descriptive metadata payload for a session deposition.
    pub async fn metadata_payload(
        &self,
        session: &SessionRecord,
        files: &[FileRecord],
    ) -> Result<serde_json::Value> {
        let context = db::sessions::load_session_context(&self.db, session.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recording session {}", session.id)))?;

        let description = build_session_description(&context, files);

        let creators = match files.first().and_then(|f| f.created_by) {
            Some(user_id) => db::sessions::creator_for_user(&self.db, user_id).await?,
            None => None,
        }
        .map(|creator| vec![creator])
        .unwrap_or_else(|| {
            vec![Creator {
                name: "Unknown, Unknown".to_string(),
                affiliation: None,
                orcid: None,
            }]
        });

        Ok(serde_json::json!({
            "title": context.session.name.clone().unwrap_or_else(|| "Untitled session".to_string()),
            "upload_type": "dataset",
            "description": description,
            "creators": creators,
            "communities": [{ "identifier": "mousetube" }],
        }))
    }

    /// Prepare (create or extend) the deposition for a recording session.
    ///
    /// Idempotent per file: files already tagged with the current deposition
    /// are skipped, and repeated calls reuse the deposition identifier the
    /// first call established.
    pub async fn prepare_deposition(
        &self,
        session: &SessionRecord,
        trigger: Option<&FileRecord>,
    ) -> Result<DepositionReport> {
        let mut files = db::files::eligible_files(&self.db, session.id).await?;
        if let Some(trigger) = trigger {
            if !files.iter().any(|f| f.id == trigger.id) {
                files.push(trigger.clone());
            }
        }

        if files.is_empty() {
            return Err(Error::InvalidInput(
                "No valid files found for this recording session".to_string(),
            )
            .into());
        }

        let tagged = files.iter().find_map(|f| match (f.repository_id, &f.external_id) {
            (Some(repository_id), Some(deposition_id)) => {
                Some((repository_id, deposition_id.clone()))
            }
            _ => None,
        });

        let (deposition_id, repository) = match tagged {
            Some((repository_id, deposition_id)) => {
                let repository = db::repositories::load_repository(&self.db, repository_id)
                    .await?
                    .ok_or_else(|| anyhow!("Repository {} not found", repository_id))?;
                tracing::info!(
                    session_id = %session.id,
                    repository = %repository.name,
                    deposition_id = %deposition_id,
                    "Reusing existing deposition"
                );
                (deposition_id, repository)
            }
            None => {
                let deposition_id = self
                    .client
                    .create_deposition()
                    .await
                    .context("Failed to create Zenodo deposition")?
                    .to_string();
                let repository = db::repositories::get_or_create(&self.db, "Zenodo").await?;
                (deposition_id, repository)
            }
        };

        let mut uploaded = Vec::new();
        let mut failed = Vec::new();
        for file in &files {
            if file.external_id.as_deref() == Some(deposition_id.as_str()) {
                // already attached to this deposition
                continue;
            }

            match self.upload_one(file, &deposition_id, repository.id).await? {
                None => uploaded.push(file.id),
                Some(reason) => {
                    tracing::warn!(
                        file_id = %file.id,
                        reason = %reason,
                        "Skipping file in deposition batch"
                    );
                    db::files::update_status(
                        &self.db,
                        file.id,
                        FileStatus::Error,
                        Some(&truncate_detail(&reason)),
                    )
                    .await?;
                    failed.push(FileFailure {
                        file_id: file.id,
                        reason,
                    });
                }
            }
        }

        self.cleanup_temp_copies(&files);

        let payload = self.metadata_payload(session, &files).await?;
        self.client
            .put_metadata(&deposition_id, &payload)
            .await
            .context("Failed to update deposition metadata")?;

        Ok(DepositionReport {
            deposition_id,
            uploaded,
            failed,
        })
    }

    /// Upload one file into the deposition. `Ok(None)` means uploaded and
    /// tagged; `Ok(Some(reason))` is an isolated per-file failure.
    async fn upload_one(
        &self,
        file: &FileRecord,
        deposition_id: &str,
        repository_id: Uuid,
    ) -> Result<Option<String>> {
        let local_path = match link_to_local_path(&file.link, &self.media_root, &self.temp_root) {
            Ok(path) => path,
            Err(e) => return Ok(Some(e.to_string())),
        };

        let file_size = std::fs::metadata(&local_path).map(|m| m.len()).unwrap_or(0);
        if !local_path.exists() || file_size == 0 {
            return Ok(Some(format!(
                "File not found or empty: {}",
                local_path.display()
            )));
        }

        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(sanitize_filename)
            .unwrap_or_else(|| sanitize_filename(&file.name));

        if let Err(e) = self
            .client
            .upload_file(deposition_id, &filename, &local_path)
            .await
        {
            return Ok(Some(format!("Upload failed: {}", e)));
        }

        db::files::tag_deposition(&self.db, file.id, repository_id, deposition_id).await?;
        Ok(None)
    }

    /// Delete staging copies under the temp root. Runs for every file of the
    /// batch, independent of individual upload outcomes.
    fn cleanup_temp_copies(&self, files: &[FileRecord]) {
        for file in files {
            let Ok(path) = link_to_local_path(&file.link, &self.media_root, &self.temp_root)
            else {
                continue;
            };
            if path.starts_with(&self.temp_root) && path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete temp copy");
                } else {
                    tracing::debug!(path = %path.display(), "Deleted temp copy after upload");
                }
            }
        }
    }

    /// Publish the session's deposition and return the minted DOI.
    pub async fn publish_deposition(
        &self,
        session: &SessionRecord,
        extra_metadata: Option<&serde_json::Value>,
    ) -> Result<PublishedDeposition> {
        let files = db::files::files_for_session(&self.db, session.id).await?;
        let deposition_id = files
            .iter()
            .find_map(|f| f.external_id.clone())
            .ok_or_else(|| {
                Error::InvalidInput(
                    "No deposition identifier found for this session".to_string(),
                )
            })?;

        if let Some(payload) = extra_metadata {
            self.client
                .put_metadata(&deposition_id, payload)
                .await
                .context("Failed to update deposition metadata before publish")?;
        }

        let published = self
            .client
            .publish(&deposition_id)
            .await
            .context("Zenodo publish failed")?;

        let doi = published.doi.ok_or_else(|| {
            Error::Internal("Zenodo did not return a DOI after publishing".to_string())
        })?;

        tracing::info!(
            session_id = %session.id,
            deposition_id = %deposition_id,
            doi = %doi,
            "Deposition published"
        );

        Ok(PublishedDeposition { deposition_id, doi })
    }

    /// Remove a file's remote copy from its deposition. Returns false when
    /// the file has no deposition or no matching remote entry.
    pub async fn delete_file(&self, file: &FileRecord) -> Result<bool> {
        let Some(deposition_id) = &file.external_id else {
            return Ok(false);
        };

        let filename = sanitize_filename(&file.name);
        let remote_files = self.client.list_files(deposition_id).await?;

        match remote_files.iter().find(|rf| rf.filename == filename) {
            Some(remote) => {
                self.client.delete_file(deposition_id, &remote.id).await?;
                tracing::info!(
                    file_id = %file.id,
                    deposition_id = %deposition_id,
                    "Deleted remote file from deposition"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Replace any character outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Assemble the plain-text deposition description: session attributes,
/// protocol, animal profiles, then one block per file.
fn build_session_description(context: &SessionContext, files: &[FileRecord]) -> String {
    let session = &context.session;
    let mut lines = vec![
        format!(
            "Recording session: {}",
            session.name.as_deref().unwrap_or("Untitled session")
        ),
        format!("Date: {}", session.date.as_deref().unwrap_or("unknown")),
        format!(
            "Duration: {} seconds",
            session
                .duration
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ),
    ];

    if let Some(description) = session.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("Session description: {}", description));
    }

    if let Some(protocol) = &context.protocol {
        lines.push(format!("Protocol: {}", protocol.name));
        if let Some(description) = protocol.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(format!("Protocol description: {}", description));
        }
    }

    for profile in &context.animal_profiles {
        lines.push(format!(
            "Animal: {}, Strain: {}, Species: {}, Sex: {}, Genotype: {}, Treatment: {}",
            profile.name,
            profile.strain.as_deref().unwrap_or("unknown"),
            profile.species.as_deref().unwrap_or("unknown"),
            profile.sex.as_deref().unwrap_or("unknown"),
            profile.genotype.as_deref().unwrap_or("unknown"),
            profile.treatment.as_deref().unwrap_or("unknown"),
        ));
    }

    for file in files {
        let display_name = if file.name.is_empty() {
            file.link.rsplit('/').next().unwrap_or(&file.link)
        } else {
            &file.name
        };
        lines.push(format!("\nFile: {}", display_name));
        lines.push(format!(
            "Format: {}",
            file.format.as_deref().unwrap_or("unknown")
        ));
        lines.push(format!(
            "Duration: {} s",
            file.duration
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ));
        lines.push(format!(
            "Sampling rate: {} Hz",
            file.sampling_rate
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ));
        lines.push(format!(
            "Bit depth: {}",
            file.bit_depth
                .map(|b| b.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ));
    }

    lines.join("\n")
}
