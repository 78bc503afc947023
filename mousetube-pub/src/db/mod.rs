//! Database operations for the publication service
//!
//! Query code lives here as free async functions over `&SqlitePool`;
//! schema creation lives in `mousetube_common::db::init`.

pub mod files;
pub mod jobs;
pub mod repositories;
pub mod sessions;
pub mod validation;
