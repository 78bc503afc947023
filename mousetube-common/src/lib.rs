//! Shared types for the mouseTube publication platform
//!
//! Carries the pieces every mouseTube service needs: the common error type,
//! configuration resolution, and database initialization.

pub mod config;
pub mod db;
pub mod error;

pub use crate::config::Settings;
pub use crate::error::{Error, Result};
