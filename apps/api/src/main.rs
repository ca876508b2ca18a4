mod config;
mod db;
mod errors;
mod fusion;
mod ids;
mod ingest;
mod interviews;
mod lifecycle;
mod llm_client;
mod media;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::fusion::FusionEngine;
use crate::lifecycle::spawn_scoring_workers;
use crate::llm_client::LlmClient;
use crate::media::MediaStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryRecordStore, PgRecordStore, RecordStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fitment API v{}", env!("CARGO_PKG_VERSION"));

    // Record store: PostgreSQL when configured, in-process otherwise
    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => Arc::new(PgRecordStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; records are kept in memory and lost on restart");
            Arc::new(MemoryRecordStore::new())
        }
    };

    // Initialize LLM client and the fusion engine around it
    let llm_timeout = Duration::from_secs(config.llm_timeout_secs);
    let llm = LlmClient::new(config.anthropic_api_key.clone(), llm_timeout)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let fusion = FusionEngine::new(Arc::new(llm), llm_timeout);

    // Media storage
    tokio::fs::create_dir_all(&config.media_root).await?;
    let media = MediaStore::new(&config.media_root, config.media_max_upload_bytes());
    info!("Media root: {}", config.media_root.display());

    // Background resume scoring
    let scoring = spawn_scoring_workers(
        store.clone(),
        fusion.clone(),
        config.scoring_workers,
        config.scoring_queue_capacity,
    );

    // Build app state
    let state = AppState {
        store,
        fusion,
        media,
        scoring,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
