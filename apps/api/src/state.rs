use std::sync::Arc;

use crate::config::Config;
use crate::fusion::FusionEngine;
use crate::lifecycle::ScoringQueue;
use crate::media::MediaStore;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL in production, in-process when no `DATABASE_URL` is set.
    pub store: Arc<dyn RecordStore>,
    pub fusion: FusionEngine,
    pub media: MediaStore,
    /// Queue feeding the background resume-scoring workers.
    pub scoring: ScoringQueue,
    pub config: Config,
}
