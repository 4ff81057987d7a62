//! Long-running housekeeping tasks spawned next to the server.
//!
//! Each task runs until its [`CancellationToken`](tokio_util::sync::CancellationToken)
//! is cancelled.

pub mod quota_pruning;
