//! mousetube-pub - Publication microservice
//!
//! Registers research recording files, extracts their audio metadata, and
//! publishes completed recording sessions to an external repository
//! (Zenodo) with a persistent DOI.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mousetube_pub::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting mousetube-pub (publication service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Missing Zenodo token is a hard startup failure
    let settings = mousetube_common::Settings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    settings.ensure_directories()?;

    info!("Data directory: {}", settings.data_dir.display());
    info!("Media root: {}", settings.media_root.display());
    info!("Temp root: {}", settings.temp_root.display());
    info!("Zenodo API: {}", settings.zenodo_api);

    let db_pool = mousetube_common::db::init_database(&settings.database_path).await?;
    info!("Database connection established");

    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(db_pool, settings);
    let app = mousetube_pub::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
