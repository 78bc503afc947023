//! mousetube-pub library interface
//!
//! Exposes the publication pipeline and HTTP surface for integration
//! testing.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use mousetube_common::Settings;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-session advisory locks
///
/// Deposition preparation holds a session's lock for its whole run, so two
/// near-simultaneous first uploads cannot both miss the "reuse existing
/// deposition" check and create duplicate remote drafts.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one session, creating it on first use
    pub async fn acquire(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(session_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved service configuration
    pub settings: Arc<Settings>,
    /// Per-session deposition locks
    pub session_locks: SessionLocks,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: Settings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            session_locks: SessionLocks::new(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::file_routes())
        .merge(api::session_routes())
        .merge(api::job_routes())
        .merge(api::repository_routes())
        .merge(api::health_routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn session_locks_serialize_same_session() {
        let locks = SessionLocks::new();
        let session_id = Uuid::new_v4();

        let guard = locks.acquire(session_id).await;

        let locks_clone = locks.clone();
        let contender = tokio::spawn(async move {
            let _guard = locks_clone.acquire(session_id).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("lock was not released")
            .unwrap();
    }

    #[tokio::test]
    async fn different_sessions_do_not_block_each_other() {
        let locks = SessionLocks::new();
        let _first = locks.acquire(Uuid::new_v4()).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(Uuid::new_v4()),
        )
        .await;
        assert!(second.is_ok());
    }
}
