//! Shared test fixtures: in-process fake Zenodo server, database seeding,
//! and WAV generation.
#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post, put},
    Json, Router,
};
use mousetube_common::Settings;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::{Path as FsPath, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Recorded state of the fake Zenodo server
#[derive(Default)]
pub struct FakeZenodoState {
    pub next_id: i64,
    /// Deposition ids created so far
    pub created: Vec<i64>,
    /// (deposition_id, file_id, filename) per accepted upload
    pub uploads: Vec<(String, String, String)>,
    /// (deposition_id, metadata) per metadata PUT
    pub metadata_updates: Vec<(String, serde_json::Value)>,
    /// Deposition ids published
    pub published: Vec<String>,
    /// Force uploads whose filename contains this substring to fail
    pub fail_uploads_matching: Option<String>,
}

pub type SharedZenodo = Arc<Mutex<FakeZenodoState>>;

async fn create_deposition(State(state): State<SharedZenodo>) -> Json<serde_json::Value> {
    let mut zenodo = state.lock().unwrap();
    zenodo.next_id += 1;
    let id = 4000 + zenodo.next_id;
    zenodo.created.push(id);
    Json(json!({ "id": id, "doi": null }))
}

async fn upload_file(
    State(state): State<SharedZenodo>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut filename = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        if let Some(name) = field.file_name() {
            filename = name.to_string();
        }
        let _ = field.bytes().await;
    }

    let mut zenodo = state.lock().unwrap();
    if let Some(pattern) = &zenodo.fail_uploads_matching {
        if filename.contains(pattern.as_str()) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "upload rejected").into_response();
        }
    }
    let file_id = format!("file-{}", zenodo.uploads.len() + 1);
    zenodo.uploads.push((id, file_id.clone(), filename.clone()));
    Json(json!({ "id": file_id, "filename": filename })).into_response()
}

async fn list_files(
    State(state): State<SharedZenodo>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let zenodo = state.lock().unwrap();
    let files: Vec<serde_json::Value> = zenodo
        .uploads
        .iter()
        .filter(|(dep, _, _)| dep == &id)
        .map(|(_, file_id, filename)| json!({ "id": file_id, "filename": filename }))
        .collect();
    Json(json!(files))
}

async fn put_metadata(
    State(state): State<SharedZenodo>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let mut zenodo = state.lock().unwrap();
    zenodo
        .metadata_updates
        .push((id.clone(), body["metadata"].clone()));
    Json(json!({ "id": id }))
}

async fn publish_deposition(
    State(state): State<SharedZenodo>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let mut zenodo = state.lock().unwrap();
    zenodo.published.push(id.clone());
    let id_num: i64 = id.parse().unwrap_or_default();
    Json(json!({ "id": id_num, "doi": format!("10.5281/zenodo.{}", id) }))
}

async fn delete_remote_file(
    State(state): State<SharedZenodo>,
    Path((id, file_id)): Path<(String, String)>,
) -> StatusCode {
    let mut zenodo = state.lock().unwrap();
    let before = zenodo.uploads.len();
    zenodo
        .uploads
        .retain(|(dep, fid, _)| !(dep == &id && fid == &file_id));
    if zenodo.uploads.len() < before {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Start an in-process fake Zenodo, returning its API base URL and state.
pub async fn start_fake_zenodo() -> (String, SharedZenodo) {
    let state: SharedZenodo = Arc::default();

    let app = Router::new()
        .route("/api/deposit/depositions", post(create_deposition))
        .route(
            "/api/deposit/depositions/:id/files",
            post(upload_file).get(list_files),
        )
        .route("/api/deposit/depositions/:id", put(put_metadata))
        .route(
            "/api/deposit/depositions/:id/actions/publish",
            post(publish_deposition),
        )
        .route(
            "/api/deposit/depositions/:id/files/:file_id",
            delete(delete_remote_file),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api", addr), state)
}

/// Single-connection in-memory database with the full schema
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    mousetube_common::db::create_all_tables(&pool)
        .await
        .expect("Failed to create schema");
    pool
}

/// Settings pointing at the fake Zenodo and scratch directories
pub fn test_settings(api_base: &str, data_dir: &FsPath) -> Settings {
    Settings {
        data_dir: data_dir.to_path_buf(),
        media_root: data_dir.join("media"),
        temp_root: data_dir.join("temp"),
        database_path: data_dir.join("mousetube.db"),
        bind_addr: "127.0.0.1:0".to_string(),
        zenodo_api: api_base.to_string(),
        zenodo_token: "test-token".to_string(),
    }
}

/// Write a mono 16-bit 44100 Hz WAV of the given length
pub fn write_test_wav(path: &FsPath, seconds: u32) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..(44100 * seconds) {
        writer.write_sample(((i % 200) as i16) * 80).unwrap();
    }
    writer.finalize().unwrap();
    path.to_path_buf()
}

/// Identifiers of a fully seeded session graph
pub struct SeededSession {
    pub session_id: Uuid,
    pub protocol_id: Uuid,
    pub laboratory_id: Uuid,
    pub study_id: Uuid,
    pub animal_profile_id: Uuid,
    pub strain_id: Uuid,
    pub software_id: Uuid,
    pub hardware_id: Uuid,
    pub session_reference_id: Uuid,
    pub software_reference_id: Uuid,
    pub user_id: Uuid,
}

/// Seed a draft session referencing one of every related entity kind.
pub async fn seed_full_session(pool: &SqlitePool) -> SeededSession {
    let ids = SeededSession {
        session_id: Uuid::new_v4(),
        protocol_id: Uuid::new_v4(),
        laboratory_id: Uuid::new_v4(),
        study_id: Uuid::new_v4(),
        animal_profile_id: Uuid::new_v4(),
        strain_id: Uuid::new_v4(),
        software_id: Uuid::new_v4(),
        hardware_id: Uuid::new_v4(),
        session_reference_id: Uuid::new_v4(),
        software_reference_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
    };

    sqlx::query("INSERT INTO laboratories (id, name) VALUES (?, ?)")
        .bind(ids.laboratory_id.to_string())
        .bind("Vocalization Lab")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO users (id, first_name, last_name) VALUES (?, ?, ?)")
        .bind(ids.user_id.to_string())
        .bind("Ada")
        .bind("Martin")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO user_profiles (id, user_id, orcid, laboratory_id) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(ids.user_id.to_string())
    .bind("0000-0002-1825-0097")
    .bind(ids.laboratory_id.to_string())
    .execute(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO protocols (id, name, description) VALUES (?, ?, ?)")
        .bind(ids.protocol_id.to_string())
        .bind("Pup isolation")
        .bind("3 minutes isolation, 25C")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO studies (id, name) VALUES (?, ?)")
        .bind(ids.study_id.to_string())
        .bind("USV ontogeny")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO strains (id, name, species) VALUES (?, ?, ?)")
        .bind(ids.strain_id.to_string())
        .bind("C57BL/6J")
        .bind("Mus musculus")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO animal_profiles (id, name, sex, genotype, treatment, strain_id) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(ids.animal_profile_id.to_string())
    .bind("pup-7")
    .bind("F")
    .bind("wt")
    .bind(Option::<String>::None)
    .bind(ids.strain_id.to_string())
    .execute(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO software (id, name) VALUES (?, ?)")
        .bind(ids.software_id.to_string())
        .bind("Avisoft-RECORDER")
        .execute(pool)
        .await
        .unwrap();

    let software_version_id = Uuid::new_v4();
    sqlx::query("INSERT INTO software_versions (id, software_id, version) VALUES (?, ?, ?)")
        .bind(software_version_id.to_string())
        .bind(ids.software_id.to_string())
        .bind("4.2.05")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO hardware (id, name, role) VALUES (?, ?, ?)")
        .bind(ids.hardware_id.to_string())
        .bind("UltraSoundGate 416H")
        .bind("soundcard")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO bibliographic_references (id, name) VALUES (?, ?)")
        .bind(ids.session_reference_id.to_string())
        .bind("Scattoni et al. 2008")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO bibliographic_references (id, name) VALUES (?, ?)")
        .bind(ids.software_reference_id.to_string())
        .bind("Recorder manual")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO recording_sessions (id, name, date, duration, description, protocol_id, laboratory_id) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(ids.session_id.to_string())
    .bind("USV pup isolation day 4")
    .bind("2024-03-18")
    .bind(300i64)
    .bind("Isolation calls recorded on postnatal day 4")
    .bind(ids.protocol_id.to_string())
    .bind(ids.laboratory_id.to_string())
    .execute(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO session_studies (session_id, study_id) VALUES (?, ?)")
        .bind(ids.session_id.to_string())
        .bind(ids.study_id.to_string())
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO session_animal_profiles (session_id, animal_profile_id) VALUES (?, ?)",
    )
    .bind(ids.session_id.to_string())
    .bind(ids.animal_profile_id.to_string())
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO session_software_versions (session_id, software_version_id) VALUES (?, ?)",
    )
    .bind(ids.session_id.to_string())
    .bind(software_version_id.to_string())
    .execute(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO session_hardware (session_id, hardware_id) VALUES (?, ?)")
        .bind(ids.session_id.to_string())
        .bind(ids.hardware_id.to_string())
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO session_references (session_id, reference_id) VALUES (?, ?)")
        .bind(ids.session_id.to_string())
        .bind(ids.session_reference_id.to_string())
        .execute(pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO software_references (software_id, reference_id) VALUES (?, ?)")
        .bind(ids.software_id.to_string())
        .bind(ids.software_reference_id.to_string())
        .execute(pool)
        .await
        .unwrap();

    ids
}

/// Fetch an entity's validation status column
pub async fn entity_status(pool: &SqlitePool, table: &str, id: Uuid) -> String {
    let sql = format!("SELECT status FROM {table} WHERE id = ?");
    sqlx::query_scalar(&sql)
        .bind(id.to_string())
        .fetch_one(pool)
        .await
        .unwrap()
}
