//! Terminal write for a diagnosis run.
//!
//! The transition is retried with exponential backoff. If it cannot be
//! written, the record is failed with a persistence error instead; if even
//! that write fails, the job is released so a later claim retries it.

use std::future::Future;
use std::time::Duration;

use sikjipsa_db::models::diagnosis_job::DiagnosisJob;
use sikjipsa_db::repositories::{DiagnosisJobRepo, DiagnosisRepo};
use sqlx::PgPool;

use super::analysis::AnalysisOutcome;

/// Seconds a released job waits per attempt already made.
const RELEASE_BACKOFF_SECS: i64 = 30;

/// Retry schedule for the terminal write.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// What happened to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalized {
    /// The outcome was written as-is.
    Written,
    /// The outcome could not be stored; the record was failed instead.
    FailedOnPersist,
    /// The record was already terminal; nothing changed.
    AlreadyTerminal,
    /// Nothing could be written; the job was released for a later retry.
    Released,
}

/// Write `outcome` for the job's diagnosis.
///
/// Returns an error only when the fallback write and the job release both
/// failed; the job's lease then expires and the job is claimed again.
pub async fn finalize(
    pool: &PgPool,
    job: &DiagnosisJob,
    outcome: &AnalysisOutcome,
    policy: RetryPolicy,
) -> Result<Finalized, sqlx::Error> {
    let diagnosis_id = job.diagnosis_id;

    let written = with_backoff(policy, move || async move {
        match outcome {
            AnalysisOutcome::Completed(done) => {
                DiagnosisRepo::complete(pool, diagnosis_id, done).await
            }
            AnalysisOutcome::Failed(message) => {
                DiagnosisRepo::fail(pool, diagnosis_id, message).await
            }
        }
    })
    .await;

    let persist_error = match written {
        Ok(true) => return Ok(Finalized::Written),
        Ok(false) => {
            tracing::warn!(diagnosis_id, "Diagnosis already terminal, result discarded");
            return Ok(Finalized::AlreadyTerminal);
        }
        Err(e) => e,
    };

    tracing::error!(diagnosis_id, error = %persist_error, "Failed to persist diagnosis result");
    let message = format!("Failed to persist diagnosis result: {persist_error}");

    match DiagnosisRepo::fail(pool, diagnosis_id, &message).await {
        Ok(true) => return Ok(Finalized::FailedOnPersist),
        Ok(false) => return Ok(Finalized::AlreadyTerminal),
        Err(e) => {
            tracing::error!(diagnosis_id, error = %e, "Failed to mark diagnosis as failed");
        }
    }

    let retry_after = RELEASE_BACKOFF_SECS * i64::from(job.attempts.max(1));
    DiagnosisJobRepo::release(pool, job.id, &message, retry_after).await?;
    tracing::warn!(diagnosis_id, job_id = job.id, retry_after, "Diagnosis job released");
    Ok(Finalized::Released)
}

/// Run `op` up to `policy.attempts` times, doubling the delay between tries.
async fn with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut delay = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.attempts => return Err(e),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "Terminal write failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}
