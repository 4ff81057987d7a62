//! Periodic cleanup of the per-user upload buckets.
//!
//! The keyed limiter keeps one entry per user that ever uploaded; buckets
//! that have refilled are indistinguishable from fresh ones and are dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::middleware::rate_limit::UploadRateLimiter;

/// How often the limiter is pruned.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Prune `limiter` every `every` until `cancel` fires.
pub async fn run(limiter: Arc<UploadRateLimiter>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Upload quota pruning started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Upload quota pruning stopping");
                break;
            }
            _ = interval.tick() => {
                let remaining = limiter.prune();
                tracing::debug!(remaining, "Upload quota buckets pruned");
            }
        }
    }
}
