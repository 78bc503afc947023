//! Publication pipeline services

pub mod file_processor;
pub mod finalizer;
pub mod jobs;
pub mod metadata_extractor;
pub mod path_resolver;
pub mod repository;
pub mod zenodo;

pub use repository::{DispatchError, RepositoryAdapter, RepositoryHandler};

/// Cap a failure message for the `status_detail` column.
pub(crate) fn truncate_detail(detail: &str) -> String {
    detail.chars().take(500).collect()
}
