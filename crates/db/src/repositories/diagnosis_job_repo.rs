//! Repository for the `diagnosis_jobs` work queue.
//!
//! Jobs are claimed with `SELECT ... FOR UPDATE SKIP LOCKED` and held by a
//! time-bounded lease. A job whose lease expired is claimable again, which
//! is how work interrupted by a crash or restart gets picked back up.

use sikjipsa_core::types::DbId;
use sqlx::PgPool;

use crate::models::diagnosis_job::DiagnosisJob;
use crate::models::status::DiagnosisStatus;

/// Column list for `diagnosis_jobs` queries.
const COLUMNS: &str = "\
    id, diagnosis_id, image_data_url, latitude, longitude, attempts, \
    locked_by, locked_at, available_at, last_error, created_at, updated_at";

/// Claim, release and inspect queued diagnosis jobs.
pub struct DiagnosisJobRepo;

impl DiagnosisJobRepo {
    /// Atomically claim the oldest available job.
    ///
    /// A job is available when its diagnosis is still processing,
    /// `available_at` has passed, and it is unlocked or its lease (older
    /// than `lease_secs`) has expired. Claiming increments `attempts`.
    pub async fn claim_next(
        pool: &PgPool,
        worker_id: &str,
        lease_secs: i64,
    ) -> Result<Option<DiagnosisJob>, sqlx::Error> {
        let query = format!(
            "UPDATE diagnosis_jobs \
             SET locked_by = $1, locked_at = NOW(), attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT j.id FROM diagnosis_jobs j \
                 JOIN diagnosis_requests d ON d.id = j.diagnosis_id \
                 WHERE d.status_id = $2 \
                   AND j.available_at <= NOW() \
                   AND (j.locked_at IS NULL \
                        OR j.locked_at < NOW() - make_interval(secs => $3)) \
                 ORDER BY j.available_at ASC, j.id ASC \
                 LIMIT 1 \
                 FOR UPDATE OF j SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DiagnosisJob>(&query)
            .bind(worker_id)
            .bind(DiagnosisStatus::Processing.id())
            .bind(lease_secs as f64)
            .fetch_optional(pool)
            .await
    }

    /// Drop the lease and make the job available again after `retry_after_secs`.
    pub async fn release(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
        retry_after_secs: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE diagnosis_jobs \
             SET locked_by = NULL, locked_at = NULL, last_error = $2, \
                 available_at = NOW() + make_interval(secs => $3) \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(error)
        .bind(retry_after_secs as f64)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// The queued job for a diagnosis, if it is still processing.
    pub async fn find_by_diagnosis(
        pool: &PgPool,
        diagnosis_id: DbId,
    ) -> Result<Option<DiagnosisJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM diagnosis_jobs WHERE diagnosis_id = $1");
        sqlx::query_as::<_, DiagnosisJob>(&query)
            .bind(diagnosis_id)
            .fetch_optional(pool)
            .await
    }
}
