//! Data models for the publication pipeline

pub mod entities;
pub mod job;
pub mod status;

pub use entities::{
    AnimalProfileInfo, Creator, FileRecord, MetadataPatch, ProtocolInfo, RepositoryRecord,
    SessionContext, SessionRecord,
};
pub use job::{JobKind, JobRecord};
pub use status::{FileStatus, JobState, SessionStatus, ValidationStatus};
