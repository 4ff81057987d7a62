use std::sync::Arc;

use sikjipsa_media::ImageHost;
use tokio::sync::Notify;

use crate::config::ServerConfig;
use crate::middleware::rate_limit::UploadRateLimiter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: sikjipsa_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Where uploaded diagnosis photos are stored.
    pub image_host: Arc<dyn ImageHost>,
    /// Per-user diagnosis upload quota.
    pub upload_limiter: Arc<UploadRateLimiter>,
    /// Wakes the diagnosis worker pool when a job is enqueued.
    pub diagnosis_queue: Arc<Notify>,
}
