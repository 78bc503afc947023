//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the catalog schema.
//! All `CREATE TABLE` statements are idempotent, so initialization is safe
//! to run on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while a background job writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Create the full catalog schema (idempotent)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_laboratories_table(pool).await?;
    create_user_profiles_table(pool).await?;
    create_repositories_table(pool).await?;
    create_references_table(pool).await?;
    create_protocols_table(pool).await?;
    create_studies_table(pool).await?;
    create_strains_table(pool).await?;
    create_animal_profiles_table(pool).await?;
    create_software_tables(pool).await?;
    create_hardware_table(pool).await?;
    create_sessions_table(pool).await?;
    create_session_link_tables(pool).await?;
    create_files_table(pool).await?;
    create_jobs_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_laboratories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS laboratories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_user_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            orcid TEXT,
            laboratory_id TEXT REFERENCES laboratories(id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_repositories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS repositories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            url TEXT,
            url_api TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_references_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bibliographic_references (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            doi TEXT,
            url TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_protocols_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS protocols (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_studies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studies (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_strains_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS strains (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            species TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_animal_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS animal_profiles (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sex TEXT,
            genotype TEXT,
            treatment TEXT,
            strain_id TEXT REFERENCES strains(id),
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_software_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software_versions (
            id TEXT PRIMARY KEY,
            software_id TEXT NOT NULL REFERENCES software(id),
            version TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software_references (
            software_id TEXT NOT NULL REFERENCES software(id),
            reference_id TEXT NOT NULL REFERENCES bibliographic_references(id),
            PRIMARY KEY (software_id, reference_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_hardware_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hardware (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('soundcard', 'microphone', 'speaker', 'amplifier')),
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hardware_references (
            hardware_id TEXT NOT NULL REFERENCES hardware(id),
            reference_id TEXT NOT NULL REFERENCES bibliographic_references(id),
            PRIMARY KEY (hardware_id, reference_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recording_sessions (
            id TEXT PRIMARY KEY,
            name TEXT,
            date TEXT,
            duration INTEGER,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            protocol_id TEXT REFERENCES protocols(id),
            laboratory_id TEXT REFERENCES laboratories(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_session_link_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_studies (
            session_id TEXT NOT NULL REFERENCES recording_sessions(id),
            study_id TEXT NOT NULL REFERENCES studies(id),
            PRIMARY KEY (session_id, study_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_animal_profiles (
            session_id TEXT NOT NULL REFERENCES recording_sessions(id),
            animal_profile_id TEXT NOT NULL REFERENCES animal_profiles(id),
            PRIMARY KEY (session_id, animal_profile_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_software_versions (
            session_id TEXT NOT NULL REFERENCES recording_sessions(id),
            software_version_id TEXT NOT NULL REFERENCES software_versions(id),
            PRIMARY KEY (session_id, software_version_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_hardware (
            session_id TEXT NOT NULL REFERENCES recording_sessions(id),
            hardware_id TEXT NOT NULL REFERENCES hardware(id),
            PRIMARY KEY (session_id, hardware_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_references (
            session_id TEXT NOT NULL REFERENCES recording_sessions(id),
            reference_id TEXT NOT NULL REFERENCES bibliographic_references(id),
            PRIMARY KEY (session_id, reference_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Create the files table
///
/// `status` is the authoritative progress marker for the publication
/// pipeline; `is_valid_link` is derived and only ever set by a successful
/// publish.
pub async fn create_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            session_id TEXT REFERENCES recording_sessions(id),
            name TEXT NOT NULL,
            link TEXT NOT NULL,
            format TEXT,
            duration INTEGER,
            sampling_rate INTEGER,
            bit_depth INTEGER,
            size INTEGER,
            doi TEXT,
            external_id TEXT,
            external_url TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            status_detail TEXT,
            is_valid_link INTEGER NOT NULL DEFAULT 0,
            repository_id TEXT REFERENCES repositories(id),
            created_by TEXT REFERENCES users(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Create the background jobs table (status polling surface)
pub async fn create_jobs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            target_id TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'queued',
            progress INTEGER NOT NULL DEFAULT 0,
            message TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database")
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = memory_pool().await;
        create_all_tables(&pool).await.unwrap();
        create_all_tables(&pool).await.unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(count >= 18);
    }

    #[tokio::test]
    async fn hardware_role_is_constrained() {
        let pool = memory_pool().await;
        create_all_tables(&pool).await.unwrap();

        let bad = sqlx::query("INSERT INTO hardware (id, name, role) VALUES ('h1', 'X', 'keyboard')")
            .execute(&pool)
            .await;
        assert!(bad.is_err());

        sqlx::query("INSERT INTO hardware (id, name, role) VALUES ('h1', 'X', 'microphone')")
            .execute(&pool)
            .await
            .unwrap();
    }
}
