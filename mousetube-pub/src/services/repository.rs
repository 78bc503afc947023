//! Repository adapter contract and dispatch
//!
//! Every supported external archive implements `RepositoryAdapter`; the
//! `RepositoryHandler` enum is the closed registry binding repository names
//! to those implementations. Looking up an unknown name yields a typed
//! `Unsupported` error so callers can report "not supported" instead of
//! crashing as archives are added over time.

use crate::models::{FileRecord, RepositoryRecord, SessionRecord};
use crate::services::zenodo::{DepositionReport, PublishedDeposition, ZenodoAdapter};
use anyhow::Result;
use mousetube_common::Settings;
use sqlx::SqlitePool;
use thiserror::Error;

/// Dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No adapter registered for this repository name
    #[error("Repository '{0}' is not yet supported")]
    Unsupported(String),

    /// Adapter construction failed (bad configuration)
    #[error("Failed to initialize adapter for '{0}': {1}")]
    Init(String, String),
}

/// Operations a repository adapter provides.
///
/// `metadata_schema` is optional and only feeds client-side form
/// generation; the other four operations drive the publication pipeline.
#[allow(async_fn_in_trait)]
pub trait RepositoryAdapter {
    /// JSON-schema description of the metadata fields this archive accepts
    fn metadata_schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// Build the descriptive metadata payload for a session
    async fn metadata_payload(
        &self,
        session: &SessionRecord,
        files: &[FileRecord],
    ) -> Result<serde_json::Value>;

    /// Create or extend the session's remote draft deposition
    async fn prepare_deposition(
        &self,
        session: &SessionRecord,
        trigger: Option<&FileRecord>,
    ) -> Result<DepositionReport>;

    /// Publish the deposition and return its permanent identifier
    async fn publish_deposition(
        &self,
        session: &SessionRecord,
        extra_metadata: Option<&serde_json::Value>,
    ) -> Result<PublishedDeposition>;

    /// Remove a file's remote copy; false when nothing matched
    async fn delete_file(&self, file: &FileRecord) -> Result<bool>;
}

impl RepositoryAdapter for ZenodoAdapter {
    fn metadata_schema(&self) -> Option<serde_json::Value> {
        Some(ZenodoAdapter::metadata_schema(self))
    }

    async fn metadata_payload(
        &self,
        session: &SessionRecord,
        files: &[FileRecord],
    ) -> Result<serde_json::Value> {
        ZenodoAdapter::metadata_payload(self, session, files).await
    }

    async fn prepare_deposition(
        &self,
        session: &SessionRecord,
        trigger: Option<&FileRecord>,
    ) -> Result<DepositionReport> {
        ZenodoAdapter::prepare_deposition(self, session, trigger).await
    }

    async fn publish_deposition(
        &self,
        session: &SessionRecord,
        extra_metadata: Option<&serde_json::Value>,
    ) -> Result<PublishedDeposition> {
        ZenodoAdapter::publish_deposition(self, session, extra_metadata).await
    }

    async fn delete_file(&self, file: &FileRecord) -> Result<bool> {
        ZenodoAdapter::delete_file(self, file).await
    }
}

/// Closed registry of supported repositories
pub enum RepositoryHandler {
    Zenodo(ZenodoAdapter),
}

impl RepositoryHandler {
    /// Resolve a handler from a repository name (matched case-insensitively)
    pub fn for_name(
        db: &SqlitePool,
        settings: &Settings,
        name: &str,
    ) -> Result<Self, DispatchError> {
        match name.to_lowercase().as_str() {
            "zenodo" => ZenodoAdapter::new(db.clone(), settings)
                .map(RepositoryHandler::Zenodo)
                .map_err(|e| DispatchError::Init("zenodo".to_string(), e.to_string())),
            _ => Err(DispatchError::Unsupported(name.to_string())),
        }
    }

    /// Resolve a handler for a repository row
    pub fn for_repository(
        db: &SqlitePool,
        settings: &Settings,
        repository: &RepositoryRecord,
    ) -> Result<Self, DispatchError> {
        Self::for_name(db, settings, &repository.name)
    }

    /// Public record base URL of the target archive
    pub fn records_base(&self) -> String {
        match self {
            RepositoryHandler::Zenodo(adapter) => adapter.records_base(),
        }
    }

    pub fn metadata_schema(&self) -> Option<serde_json::Value> {
        match self {
            RepositoryHandler::Zenodo(adapter) => RepositoryAdapter::metadata_schema(adapter),
        }
    }

    pub async fn metadata_payload(
        &self,
        session: &SessionRecord,
        files: &[FileRecord],
    ) -> Result<serde_json::Value> {
        match self {
            RepositoryHandler::Zenodo(adapter) => adapter.metadata_payload(session, files).await,
        }
    }

    pub async fn prepare_deposition(
        &self,
        session: &SessionRecord,
        trigger: Option<&FileRecord>,
    ) -> Result<DepositionReport> {
        match self {
            RepositoryHandler::Zenodo(adapter) => {
                adapter.prepare_deposition(session, trigger).await
            }
        }
    }

    pub async fn publish_deposition(
        &self,
        session: &SessionRecord,
        extra_metadata: Option<&serde_json::Value>,
    ) -> Result<PublishedDeposition> {
        match self {
            RepositoryHandler::Zenodo(adapter) => {
                adapter.publish_deposition(session, extra_metadata).await
            }
        }
    }

    pub async fn delete_file(&self, file: &FileRecord) -> Result<bool> {
        match self {
            RepositoryHandler::Zenodo(adapter) => adapter.delete_file(file).await,
        }
    }
}
