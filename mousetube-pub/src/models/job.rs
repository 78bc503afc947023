//! Background job records
//!
//! Jobs are the only failure-reporting channel of the pipeline: clients poll
//! a job's coarse state, 0-100 progress, and completion message.

use crate::models::status::JobState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of background work a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    ProcessFile,
    PublishSession,
    DeleteFile,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ProcessFile => "process_file",
            JobKind::PublishSession => "publish_session",
            JobKind::DeleteFile => "delete_file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "process_file" => Some(JobKind::ProcessFile),
            "publish_session" => Some(JobKind::PublishSession),
            "delete_file" => Some(JobKind::DeleteFile),
            _ => None,
        }
    }
}

/// A background job row
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: JobKind,
    /// File or session the job operates on
    pub target_id: Uuid,
    pub state: JobState,
    /// 0-100
    pub progress: i64,
    pub message: Option<String>,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(kind: JobKind, target_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            target_id,
            state: JobState::Queued,
            progress: 0,
            message: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
