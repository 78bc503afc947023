//! Validation status cascade
//!
//! Once a session is published, every descriptive entity it references
//! transitively becomes "validated" and publicly citable. Statuses only
//! ever move towards validated; nothing here can revert one.

use crate::models::SessionRecord;
use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Counts of entities validated by one cascade
#[derive(Debug, Default, Clone, Serialize)]
pub struct ValidationSummary {
    pub protocols: u64,
    pub laboratories: u64,
    pub studies: u64,
    pub animal_profiles: u64,
    pub strains: u64,
    pub software: u64,
    pub hardware: u64,
    pub references: u64,
}

/// Validate the transitive closure of entities referenced by a session.
///
/// Covers: protocol, laboratory, studies, animal profiles, strains reachable
/// through those profiles, software behind the session's acquisition
/// software versions, all hardware roles, and references attached to the
/// session or to the validated software/hardware.
pub async fn cascade_session_validation(
    pool: &SqlitePool,
    session: &SessionRecord,
) -> Result<ValidationSummary> {
    let mut summary = ValidationSummary::default();
    let session_id = session.id.to_string();

    if let Some(protocol_id) = session.protocol_id {
        summary.protocols = validate_by_id(pool, "protocols", protocol_id).await?;
    }
    if let Some(laboratory_id) = session.laboratory_id {
        summary.laboratories = validate_by_id(pool, "laboratories", laboratory_id).await?;
    }

    summary.studies = sqlx::query(
        r#"
        UPDATE studies SET status = 'validated'
        WHERE status != 'validated'
          AND id IN (SELECT study_id FROM session_studies WHERE session_id = ?)
        "#,
    )
    .bind(&session_id)
    .execute(pool)
    .await?
    .rows_affected();

    summary.animal_profiles = sqlx::query(
        r#"
        UPDATE animal_profiles SET status = 'validated'
        WHERE status != 'validated'
          AND id IN (SELECT animal_profile_id FROM session_animal_profiles WHERE session_id = ?)
        "#,
    )
    .bind(&session_id)
    .execute(pool)
    .await?
    .rows_affected();

    summary.strains = sqlx::query(
        r#"
        UPDATE strains SET status = 'validated'
        WHERE status != 'validated'
          AND id IN (
            SELECT ap.strain_id
            FROM animal_profiles ap
            JOIN session_animal_profiles sap ON sap.animal_profile_id = ap.id
            WHERE sap.session_id = ? AND ap.strain_id IS NOT NULL
          )
        "#,
    )
    .bind(&session_id)
    .execute(pool)
    .await?
    .rows_affected();

    summary.software = sqlx::query(
        r#"
        UPDATE software SET status = 'validated'
        WHERE status != 'validated'
          AND id IN (
            SELECT sv.software_id
            FROM software_versions sv
            JOIN session_software_versions ssv ON ssv.software_version_id = sv.id
            WHERE ssv.session_id = ?
          )
        "#,
    )
    .bind(&session_id)
    .execute(pool)
    .await?
    .rows_affected();

    summary.hardware = sqlx::query(
        r#"
        UPDATE hardware SET status = 'validated'
        WHERE status != 'validated'
          AND id IN (SELECT hardware_id FROM session_hardware WHERE session_id = ?)
        "#,
    )
    .bind(&session_id)
    .execute(pool)
    .await?
    .rows_affected();

    // References attached to the session itself, plus those carried by the
    // software and hardware validated above.
    summary.references = sqlx::query(
        r#"
        UPDATE bibliographic_references SET status = 'validated'
        WHERE status != 'validated'
          AND id IN (
            SELECT reference_id FROM session_references WHERE session_id = ?1
            UNION
            SELECT sr.reference_id
            FROM software_references sr
            JOIN software_versions sv ON sv.software_id = sr.software_id
            JOIN session_software_versions ssv ON ssv.software_version_id = sv.id
            WHERE ssv.session_id = ?1
            UNION
            SELECT hr.reference_id
            FROM hardware_references hr
            JOIN session_hardware sh ON sh.hardware_id = hr.hardware_id
            WHERE sh.session_id = ?1
          )
        "#,
    )
    .bind(&session_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(summary)
}

async fn validate_by_id(pool: &SqlitePool, table: &str, id: Uuid) -> Result<u64> {
    let sql = format!(
        "UPDATE {table} SET status = 'validated' WHERE id = ? AND status != 'validated'"
    );
    let result = sqlx::query(&sql).bind(id.to_string()).execute(pool).await?;
    Ok(result.rows_affected())
}
