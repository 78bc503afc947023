//! Zenodo repository adapter
//!
//! `client` speaks the deposition REST API; `adapter` drives it for a
//! recording session: incremental draft building, publication, and remote
//! file deletion.

pub mod adapter;
pub mod client;

pub use adapter::{DepositionReport, FileFailure, PublishedDeposition, ZenodoAdapter};
pub use client::{ZenodoClient, ZenodoError};
