//! Repository metadata schema endpoint

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::services::RepositoryHandler;
use crate::AppState;

/// GET /repositories/{name}/schema
///
/// JSON-schema description of the metadata fields the named repository
/// accepts, used for client-side form generation. Unsupported repositories
/// yield a typed 501, not a crash.
pub async fn get_metadata_schema(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let handler = RepositoryHandler::for_name(&state.db, &state.settings, &name)?;

    handler
        .metadata_schema()
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Repository '{}' does not publish a metadata schema",
                name
            ))
        })
}

pub fn repository_routes() -> Router<AppState> {
    Router::new().route("/repositories/:name/schema", get(get_metadata_schema))
}
