//! Recording session database operations

use crate::models::{
    AnimalProfileInfo, Creator, ProtocolInfo, SessionContext, SessionRecord, SessionStatus,
};
use anyhow::{anyhow, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    let protocol_id: Option<String> = row.get("protocol_id");
    let laboratory_id: Option<String> = row.get("laboratory_id");

    Ok(SessionRecord {
        id: Uuid::parse_str(&id)?,
        name: row.get("name"),
        date: row.get("date"),
        duration: row.get("duration"),
        description: row.get("description"),
        status: SessionStatus::parse(&status)
            .ok_or_else(|| anyhow!("Unknown session status in database: {}", status))?,
        protocol_id: protocol_id.as_deref().map(Uuid::parse_str).transpose()?,
        laboratory_id: laboratory_id.as_deref().map(Uuid::parse_str).transpose()?,
    })
}

/// Load a session by id
pub async fn load_session(pool: &SqlitePool, id: Uuid) -> Result<Option<SessionRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, date, duration, description, status, protocol_id, laboratory_id
        FROM recording_sessions
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_session_row).transpose()
}

/// Update a session's lifecycle status
pub async fn update_session_status(
    pool: &SqlitePool,
    id: Uuid,
    status: SessionStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE recording_sessions
        SET status = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a session together with the protocol and animal-profile attributes
/// the deposition description needs.
pub async fn load_session_context(
    pool: &SqlitePool,
    id: Uuid,
) -> Result<Option<SessionContext>> {
    let Some(session) = load_session(pool, id).await? else {
        return Ok(None);
    };

    let protocol = match session.protocol_id {
        Some(protocol_id) => sqlx::query(
            "SELECT name, description FROM protocols WHERE id = ?",
        )
        .bind(protocol_id.to_string())
        .fetch_optional(pool)
        .await?
        .map(|row| ProtocolInfo {
            name: row.get("name"),
            description: row.get("description"),
        }),
        None => None,
    };

    let profile_rows = sqlx::query(
        r#"
        SELECT ap.name, ap.sex, ap.genotype, ap.treatment,
               s.name AS strain_name, s.species AS species
        FROM session_animal_profiles sap
        JOIN animal_profiles ap ON ap.id = sap.animal_profile_id
        LEFT JOIN strains s ON s.id = ap.strain_id
        WHERE sap.session_id = ?
        ORDER BY ap.name
        "#,
    )
    .bind(id.to_string())
    .fetch_all(pool)
    .await?;

    let animal_profiles = profile_rows
        .iter()
        .map(|row| AnimalProfileInfo {
            name: row.get("name"),
            sex: row.get("sex"),
            genotype: row.get("genotype"),
            treatment: row.get("treatment"),
            strain: row.get("strain_name"),
            species: row.get("species"),
        })
        .collect();

    Ok(Some(SessionContext {
        session,
        protocol,
        animal_profiles,
    }))
}

/// Build the deposition creator entry for a user: family/given name,
/// laboratory affiliation, ORCID when linked.
pub async fn creator_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Creator>> {
    let row = sqlx::query(
        r#"
        SELECT u.first_name, u.last_name, p.orcid, l.name AS laboratory
        FROM users u
        LEFT JOIN user_profiles p ON p.user_id = u.id
        LEFT JOIN laboratories l ON l.id = p.laboratory_id
        WHERE u.id = ?
        "#,
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        let first_name: Option<String> = row.get("first_name");
        let last_name: Option<String> = row.get("last_name");
        let family = last_name.filter(|s| !s.is_empty()).unwrap_or_else(|| "Unknown".to_string());
        let given = first_name.filter(|s| !s.is_empty()).unwrap_or_else(|| "Unknown".to_string());
        Creator {
            name: format!("{}, {}", family, given),
            affiliation: row.get("laboratory"),
            orcid: row.get("orcid"),
        }
    }))
}
