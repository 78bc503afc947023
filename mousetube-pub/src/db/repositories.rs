//! Repository database operations
//!
//! Repository rows describe target external archives. They are read-mostly;
//! the pipeline only ever creates the "Zenodo" row on first use.

use crate::models::RepositoryRecord;
use anyhow::Result;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn map_repository_row(row: &sqlx::sqlite::SqliteRow) -> Result<RepositoryRecord> {
    let id: String = row.get("id");
    Ok(RepositoryRecord {
        id: Uuid::parse_str(&id)?,
        name: row.get("name"),
        url: row.get("url"),
        url_api: row.get("url_api"),
    })
}

/// Load a repository by id
pub async fn load_repository(pool: &SqlitePool, id: Uuid) -> Result<Option<RepositoryRecord>> {
    let row = sqlx::query("SELECT id, name, url, url_api FROM repositories WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_repository_row).transpose()
}

/// Load a repository by name, case-insensitively
pub async fn load_by_name(pool: &SqlitePool, name: &str) -> Result<Option<RepositoryRecord>> {
    let row = sqlx::query(
        "SELECT id, name, url, url_api FROM repositories WHERE lower(name) = lower(?)",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_repository_row).transpose()
}

/// Look up a repository by name, creating the row if missing
pub async fn get_or_create(pool: &SqlitePool, name: &str) -> Result<RepositoryRecord> {
    if let Some(existing) = load_by_name(pool, name).await? {
        return Ok(existing);
    }

    let record = RepositoryRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        url: None,
        url_api: None,
    };

    // Another worker may insert the same name concurrently; the unique
    // constraint makes the insert lose and the re-read win.
    let inserted = sqlx::query("INSERT OR IGNORE INTO repositories (id, name) VALUES (?, ?)")
        .bind(record.id.to_string())
        .bind(&record.name)
        .execute(pool)
        .await?;

    if inserted.rows_affected() > 0 {
        Ok(record)
    } else {
        load_by_name(pool, name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Repository '{}' vanished during get_or_create", name))
    }
}
