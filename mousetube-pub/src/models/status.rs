//! Status state machines for files, sessions, entities, and jobs
//!
//! Each status is a closed enum serialized to the wire/database strings the
//! rest of the platform expects. File processing progresses
//! pending → processing → metadata_extracted → done, with error reachable
//! from any non-terminal state.

use serde::{Deserialize, Serialize};

/// Processing status of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Registered, not yet picked up by a worker
    Pending,
    /// A worker is extracting metadata / uploading
    Processing,
    /// Metadata extracted, deposition attachment pending
    MetadataExtracted,
    /// Attached to a deposition, ready for publish
    Done,
    /// Processing failed (see status_detail)
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Processing => "processing",
            FileStatus::MetadataExtracted => "metadata_extracted",
            FileStatus::Done => "done",
            FileStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FileStatus::Pending),
            "processing" => Some(FileStatus::Processing),
            "metadata_extracted" => Some(FileStatus::MetadataExtracted),
            "done" => Some(FileStatus::Done),
            "error" => Some(FileStatus::Error),
            _ => None,
        }
    }

    /// Files in these states are excluded from deposition upload.
    pub fn is_eligible_for_deposition(&self) -> bool {
        !matches!(
            self,
            FileStatus::Pending | FileStatus::Processing | FileStatus::Error
        )
    }

    /// Legal transitions of the per-file state machine
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        use FileStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, MetadataExtracted)
                | (Processing, Done)
                | (Processing, Error)
                | (MetadataExtracted, Done)
                | (MetadataExtracted, Error)
                | (Error, Processing)
        )
    }
}

/// Lifecycle status of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    Published,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(SessionStatus::Draft),
            "published" => Some(SessionStatus::Published),
            _ => None,
        }
    }
}

/// Validation status of descriptive entities (protocol, laboratory, ...)
///
/// Moves from pending to validated as a side effect of a successful publish
/// and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Validated,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Validated => "validated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ValidationStatus::Pending),
            "validated" => Some(ValidationStatus::Validated),
            _ => None,
        }
    }
}

/// Coarse state of a background job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Started,
    Success,
    Failure,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Started => "started",
            JobState::Success => "success",
            JobState::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobState::Queued),
            "started" => Some(JobState::Started),
            "success" => Some(JobState::Success),
            "failure" => Some(JobState::Failure),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}
