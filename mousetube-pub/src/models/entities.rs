//! Catalog entity records read and written by the publication pipeline

use crate::models::status::{FileStatus, SessionStatus};
use serde::Serialize;
use uuid::Uuid;

/// A registered audio file
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub session_id: Option<Uuid>,
    pub name: String,
    /// Location pointer: http(s) URL, `/media/...`, `/temp/...`, or a local path
    pub link: String,
    pub format: Option<String>,
    /// Whole seconds
    pub duration: Option<i64>,
    /// Hz
    pub sampling_rate: Option<i64>,
    pub bit_depth: Option<i64>,
    /// Bytes
    pub size: Option<i64>,
    pub doi: Option<String>,
    /// Remote deposition identifier, session-scoped once assigned
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub status: FileStatus,
    pub status_detail: Option<String>,
    pub is_valid_link: bool,
    pub repository_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

impl FileRecord {
    /// Create a new pending file record
    pub fn new(name: String, link: String, session_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            name,
            link,
            format: None,
            duration: None,
            sampling_rate: None,
            bit_depth: None,
            size: None,
            doi: None,
            external_id: None,
            external_url: None,
            status: FileStatus::Pending,
            status_detail: None,
            is_valid_link: false,
            repository_id: None,
            created_by: None,
        }
    }

    /// A file is eligible for deposition upload unless it is still pending,
    /// mid-processing, errored, or already published under its own DOI.
    pub fn is_eligible_for_deposition(&self) -> bool {
        self.status.is_eligible_for_deposition() && self.doi.is_none()
    }
}

/// A recording session
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub name: Option<String>,
    pub date: Option<String>,
    pub duration: Option<i64>,
    pub description: Option<String>,
    pub status: SessionStatus,
    pub protocol_id: Option<Uuid>,
    pub laboratory_id: Option<Uuid>,
}

/// A target external archive
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryRecord {
    pub id: Uuid,
    pub name: String,
    pub url: Option<String>,
    pub url_api: Option<String>,
}

/// Protocol attributes used by the deposition description
#[derive(Debug, Clone)]
pub struct ProtocolInfo {
    pub name: String,
    pub description: Option<String>,
}

/// Animal profile summary used by the deposition description
#[derive(Debug, Clone)]
pub struct AnimalProfileInfo {
    pub name: String,
    pub sex: Option<String>,
    pub genotype: Option<String>,
    pub treatment: Option<String>,
    pub strain: Option<String>,
    pub species: Option<String>,
}

/// Everything the metadata payload builder needs about a session
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: SessionRecord,
    pub protocol: Option<ProtocolInfo>,
    pub animal_profiles: Vec<AnimalProfileInfo>,
}

/// A deposition creator, derived from the uploading user's profile
#[derive(Debug, Clone, Serialize)]
pub struct Creator {
    /// "Family, Given"
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
}

/// Changed-fields set for audio metadata updates
///
/// Only fields present here are written back; the extractor leaves a field
/// `None` when the record already carried a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub format: Option<String>,
    pub duration: Option<i64>,
    pub sampling_rate: Option<i64>,
    pub bit_depth: Option<i64>,
    pub size: Option<i64>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.format.is_none()
            && self.duration.is_none()
            && self.sampling_rate.is_none()
            && self.bit_depth.is_none()
            && self.size.is_none()
    }
}
