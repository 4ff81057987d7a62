//! Background diagnosis dispatcher.
//!
//! Wakes on an in-process notification from the upload handler or on a
//! poll tick, claims queued jobs with [`DiagnosisJobRepo::claim_next`] and
//! runs at most `concurrency` diagnoses at once, each on its own task.

use std::sync::Arc;
use std::time::Duration;

use sikjipsa_db::models::diagnosis_job::DiagnosisJob;
use sikjipsa_db::repositories::DiagnosisJobRepo;
use sikjipsa_plantid::{ImageInput, PlantDiagnosisProvider};
use sqlx::PgPool;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::analysis::{self, AnalysisOutcome};
use super::finalize::{self, Finalized, RetryPolicy};

/// Worker pool settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum diagnoses running at once (default: `4`).
    pub concurrency: usize,
    /// Fallback poll interval when no notification arrives (default: 5 s).
    pub poll_interval: Duration,
    /// Lease held on a claimed job before it is considered abandoned (default: `300`).
    pub lease_secs: i64,
    /// Claims allowed before a job is failed outright (default: `3`).
    pub max_attempts: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_secs(5),
            lease_secs: 300,
            max_attempts: 3,
        }
    }
}

impl DispatcherConfig {
    /// Load worker pool settings from environment variables.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `DIAGNOSIS_CONCURRENCY`        | `4`     |
    /// | `DIAGNOSIS_POLL_INTERVAL_SECS` | `5`     |
    /// | `DIAGNOSIS_LEASE_SECS`         | `300`   |
    /// | `DIAGNOSIS_MAX_ATTEMPTS`       | `3`     |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let concurrency: usize = std::env::var("DIAGNOSIS_CONCURRENCY")
            .unwrap_or_else(|_| defaults.concurrency.to_string())
            .parse()
            .expect("DIAGNOSIS_CONCURRENCY must be a valid usize");

        let poll_interval_secs: u64 = std::env::var("DIAGNOSIS_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| defaults.poll_interval.as_secs().to_string())
            .parse()
            .expect("DIAGNOSIS_POLL_INTERVAL_SECS must be a valid u64");

        let lease_secs: i64 = std::env::var("DIAGNOSIS_LEASE_SECS")
            .unwrap_or_else(|_| defaults.lease_secs.to_string())
            .parse()
            .expect("DIAGNOSIS_LEASE_SECS must be a valid i64");

        let max_attempts: i32 = std::env::var("DIAGNOSIS_MAX_ATTEMPTS")
            .unwrap_or_else(|_| defaults.max_attempts.to_string())
            .parse()
            .expect("DIAGNOSIS_MAX_ATTEMPTS must be a valid i32");

        Self {
            concurrency: concurrency.max(1),
            poll_interval: Duration::from_secs(poll_interval_secs.max(1)),
            lease_secs,
            max_attempts,
        }
    }
}

/// Claims diagnosis jobs and drives them to a terminal state.
pub struct DiagnosisDispatcher {
    pool: PgPool,
    provider: Arc<dyn PlantDiagnosisProvider>,
    queue: Arc<Notify>,
    config: DispatcherConfig,
    retry: RetryPolicy,
    worker_id: String,
}

impl DiagnosisDispatcher {
    pub fn new(
        pool: PgPool,
        provider: Arc<dyn PlantDiagnosisProvider>,
        queue: Arc<Notify>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            pool,
            provider,
            queue,
            config,
            retry: RetryPolicy::default(),
            worker_id: format!("diagnosis-{}", uuid::Uuid::new_v4()),
        }
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    ///
    /// On cancellation no new jobs are claimed and in-flight diagnoses get
    /// up to `grace` to finish. Anything still running is aborted; its lease
    /// expires and the job is picked up again after restart.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken, grace: Duration) {
        let slots = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        tracing::info!(
            worker_id = %self.worker_id,
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Diagnosis dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Diagnosis dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {}
                _ = self.queue.notified() => {}
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Diagnosis task panicked");
                    }
                }
            }

            self.fill(&slots, &mut tasks).await;
        }

        let in_flight = tasks.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for in-flight diagnoses");
            let drained = tokio::time::timeout(grace, async {
                while tasks.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                tracing::warn!(
                    remaining = tasks.len(),
                    "Aborting unfinished diagnoses; their leases will expire",
                );
                tasks.shutdown().await;
            }
        }

        tracing::info!("Diagnosis dispatcher stopped");
    }

    /// Claim jobs while there is free capacity.
    async fn fill(self: &Arc<Self>, slots: &Arc<Semaphore>, tasks: &mut JoinSet<()>) {
        loop {
            let Ok(permit) = Arc::clone(slots).try_acquire_owned() else {
                return;
            };

            let job = match self.claim().await {
                Ok(Some(job)) => job,
                Ok(None) => return,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim diagnosis job");
                    return;
                }
            };

            let this = Arc::clone(self);
            tasks.spawn(async move {
                this.process(job).await;
                drop(permit);
            });
        }
    }

    /// Claim the next available job, if any.
    pub async fn claim(&self) -> Result<Option<DiagnosisJob>, sqlx::Error> {
        let job =
            DiagnosisJobRepo::claim_next(&self.pool, &self.worker_id, self.config.lease_secs)
                .await?;
        if let Some(job) = &job {
            tracing::info!(
                job_id = job.id,
                diagnosis_id = job.diagnosis_id,
                attempts = job.attempts,
                worker_id = %self.worker_id,
                "Diagnosis job claimed",
            );
        }
        Ok(job)
    }

    /// Claim and process one job inline. Returns `false` if none was available.
    pub async fn process_next(&self) -> Result<bool, sqlx::Error> {
        match self.claim().await? {
            Some(job) => {
                self.process(job).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one claimed job to a terminal state.
    async fn process(&self, job: DiagnosisJob) {
        let diagnosis_id = job.diagnosis_id;

        let outcome = if job.attempts > self.config.max_attempts {
            let cause = job.last_error.as_deref().unwrap_or("worker interrupted");
            tracing::warn!(diagnosis_id, attempts = job.attempts, "Diagnosis exceeded max attempts");
            AnalysisOutcome::Failed(format!(
                "Diagnosis abandoned after {} attempts: {cause}",
                self.config.max_attempts
            ))
        } else {
            let image = ImageInput {
                data_url: job.image_data_url.clone(),
                latitude: job.latitude,
                longitude: job.longitude,
            };
            analysis::analyze(self.provider.as_ref(), diagnosis_id, &image).await
        };

        match finalize::finalize(&self.pool, &job, &outcome, self.retry).await {
            Ok(Finalized::Written) => {
                let status = match outcome {
                    AnalysisOutcome::Completed(_) => "completed",
                    AnalysisOutcome::Failed(_) => "failed",
                };
                tracing::info!(diagnosis_id, status, "Diagnosis finalized");
            }
            Ok(other) => {
                tracing::warn!(diagnosis_id, result = ?other, "Diagnosis finalized with fallback");
            }
            Err(e) => {
                tracing::error!(
                    diagnosis_id,
                    error = %e,
                    "Could not finalize or release diagnosis job; lease expiry will retry",
                );
            }
        }
    }
}
