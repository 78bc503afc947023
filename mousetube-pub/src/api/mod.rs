//! HTTP API handlers for mousetube-pub
//!
//! Thin transport over the pipeline: handlers validate input, enqueue
//! background jobs, and surface job/entity state. All heavy work happens in
//! spawned tasks communicating through the datastore.

pub mod files;
pub mod health;
pub mod jobs;
pub mod repositories;
pub mod sessions;

pub use files::file_routes;
pub use health::health_routes;
pub use jobs::job_routes;
pub use repositories::repository_routes;
pub use sessions::session_routes;
