//! File database operations

use crate::models::{FileRecord, FileStatus, MetadataPatch};
use anyhow::{anyhow, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn map_file_row(row: &sqlx::sqlite::SqliteRow) -> Result<FileRecord> {
    let id: String = row.get("id");
    let session_id: Option<String> = row.get("session_id");
    let repository_id: Option<String> = row.get("repository_id");
    let created_by: Option<String> = row.get("created_by");
    let status: String = row.get("status");
    let is_valid_link: i64 = row.get("is_valid_link");

    Ok(FileRecord {
        id: Uuid::parse_str(&id)?,
        session_id: session_id.as_deref().map(Uuid::parse_str).transpose()?,
        name: row.get("name"),
        link: row.get("link"),
        format: row.get("format"),
        duration: row.get("duration"),
        sampling_rate: row.get("sampling_rate"),
        bit_depth: row.get("bit_depth"),
        size: row.get("size"),
        doi: row.get("doi"),
        external_id: row.get("external_id"),
        external_url: row.get("external_url"),
        status: FileStatus::parse(&status)
            .ok_or_else(|| anyhow!("Unknown file status in database: {}", status))?,
        status_detail: row.get("status_detail"),
        is_valid_link: is_valid_link != 0,
        repository_id: repository_id.as_deref().map(Uuid::parse_str).transpose()?,
        created_by: created_by.as_deref().map(Uuid::parse_str).transpose()?,
    })
}

const FILE_COLUMNS: &str = "id, session_id, name, link, format, duration, sampling_rate, \
     bit_depth, size, doi, external_id, external_url, status, status_detail, \
     is_valid_link, repository_id, created_by";

/// Insert a new file record
pub async fn create_file(pool: &SqlitePool, file: &FileRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO files (id, session_id, name, link, format, duration, sampling_rate,
                           bit_depth, size, doi, external_id, external_url, status,
                           status_detail, is_valid_link, repository_id, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(file.id.to_string())
    .bind(file.session_id.map(|id| id.to_string()))
    .bind(&file.name)
    .bind(&file.link)
    .bind(&file.format)
    .bind(file.duration)
    .bind(file.sampling_rate)
    .bind(file.bit_depth)
    .bind(file.size)
    .bind(&file.doi)
    .bind(&file.external_id)
    .bind(&file.external_url)
    .bind(file.status.as_str())
    .bind(&file.status_detail)
    .bind(file.is_valid_link as i64)
    .bind(file.repository_id.map(|id| id.to_string()))
    .bind(file.created_by.map(|id| id.to_string()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a file by id
pub async fn load_file(pool: &SqlitePool, id: Uuid) -> Result<Option<FileRecord>> {
    let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_file_row).transpose()
}

/// All files of a session, oldest first
pub async fn files_for_session(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<FileRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {FILE_COLUMNS} FROM files WHERE session_id = ? ORDER BY created_at, id"
    ))
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_file_row).collect()
}

/// Files eligible for deposition upload: not pending/processing/error and
/// not already published under their own DOI.
pub async fn eligible_files(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<FileRecord>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {FILE_COLUMNS} FROM files
        WHERE session_id = ?
          AND status NOT IN ('pending', 'processing', 'error')
          AND doi IS NULL
        ORDER BY created_at, id
        "#
    ))
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_file_row).collect()
}

/// Update a file's processing status (and optional human-readable detail)
pub async fn update_status(
    pool: &SqlitePool,
    id: Uuid,
    status: FileStatus,
    detail: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE files
        SET status = ?, status_detail = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(detail)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Write back extracted metadata, touching only the columns present in the
/// patch.
pub async fn apply_metadata_patch(
    pool: &SqlitePool,
    id: Uuid,
    patch: &MetadataPatch,
) -> Result<()> {
    if patch.is_empty() {
        return Ok(());
    }

    let mut query: sqlx::QueryBuilder<sqlx::Sqlite> =
        sqlx::QueryBuilder::new("UPDATE files SET updated_at = CURRENT_TIMESTAMP");
    if let Some(format) = &patch.format {
        query.push(", format = ").push_bind(format);
    }
    if let Some(duration) = patch.duration {
        query.push(", duration = ").push_bind(duration);
    }
    if let Some(sampling_rate) = patch.sampling_rate {
        query.push(", sampling_rate = ").push_bind(sampling_rate);
    }
    if let Some(bit_depth) = patch.bit_depth {
        query.push(", bit_depth = ").push_bind(bit_depth);
    }
    if let Some(size) = patch.size {
        query.push(", size = ").push_bind(size);
    }
    query.push(" WHERE id = ").push_bind(id.to_string());

    query.build().execute(pool).await?;
    Ok(())
}

/// Tag a file with the repository and deposition it was uploaded to
pub async fn tag_deposition(
    pool: &SqlitePool,
    id: Uuid,
    repository_id: Uuid,
    external_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE files
        SET repository_id = ?, external_id = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(repository_id.to_string())
    .bind(external_id)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Stamp a file with its minted DOI and resolvable links.
///
/// Guarded on `doi IS NULL`: a file already carrying a DOI is externally
/// immutable and must not be overwritten.
pub async fn stamp_publication(
    pool: &SqlitePool,
    id: Uuid,
    doi: &str,
    link: &str,
    external_url: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE files
        SET doi = ?, link = ?, external_url = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND doi IS NULL
        "#,
    )
    .bind(doi)
    .bind(link)
    .bind(external_url)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Detach the repository reference of DOI-bearing session files whose link
/// points outside the given base URL (they belong to another archive).
pub async fn detach_foreign_repositories(
    pool: &SqlitePool,
    session_id: Uuid,
    base_url: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE files
        SET repository_id = NULL, updated_at = CURRENT_TIMESTAMP
        WHERE session_id = ?
          AND doi IS NOT NULL
          AND repository_id IS NOT NULL
          AND link NOT LIKE ? || '%'
        "#,
    )
    .bind(session_id.to_string())
    .bind(base_url)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Mark the valid-link flag on every session file whose processing reached
/// the terminal done state.
pub async fn mark_valid_links(pool: &SqlitePool, session_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE files
        SET is_valid_link = 1, updated_at = CURRENT_TIMESTAMP
        WHERE session_id = ? AND status = 'done'
        "#,
    )
    .bind(session_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a file row; returns false when it was already gone.
pub async fn delete_file_row(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        mousetube_common::db::create_all_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let pool = test_pool().await;

        let file = FileRecord::new(
            "recording_01.wav".to_string(),
            "/media/recording_01.wav".to_string(),
            None,
        );
        create_file(&pool, &file).await.unwrap();

        let loaded = load_file(&pool, file.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, file.name);
        assert_eq!(loaded.link, file.link);
        assert_eq!(loaded.status, FileStatus::Pending);
        assert!(!loaded.is_valid_link);
    }

    #[tokio::test]
    async fn metadata_patch_only_touches_present_fields() {
        let pool = test_pool().await;

        let mut file = FileRecord::new("a.wav".into(), "/media/a.wav".into(), None);
        file.format = Some("wav".to_string());
        create_file(&pool, &file).await.unwrap();

        let patch = MetadataPatch {
            sampling_rate: Some(44100),
            duration: Some(2),
            ..Default::default()
        };
        apply_metadata_patch(&pool, file.id, &patch).await.unwrap();

        let loaded = load_file(&pool, file.id).await.unwrap().unwrap();
        assert_eq!(loaded.sampling_rate, Some(44100));
        assert_eq!(loaded.duration, Some(2));
        assert_eq!(loaded.format, Some("wav".to_string()));
        assert_eq!(loaded.bit_depth, None);
    }

    #[tokio::test]
    async fn stamp_publication_respects_existing_doi() {
        let pool = test_pool().await;

        let mut file = FileRecord::new("a.wav".into(), "https://elsewhere.org/a".into(), None);
        file.doi = Some("10.9999/existing".to_string());
        create_file(&pool, &file).await.unwrap();

        let stamped = stamp_publication(
            &pool,
            file.id,
            "10.5281/zenodo.1",
            "https://zenodo.org/records/1/files/a.wav?download=1",
            "https://zenodo.org/records/1",
        )
        .await
        .unwrap();
        assert!(!stamped);

        let loaded = load_file(&pool, file.id).await.unwrap().unwrap();
        assert_eq!(loaded.doi, Some("10.9999/existing".to_string()));
        assert_eq!(loaded.link, "https://elsewhere.org/a");
    }
}
