//! Repository for the `diagnosis_requests` table.
//!
//! Terminal transitions are conditional on `status_id = processing` and
//! remove the record's job row in the same transaction, so a record is
//! finalized at most once and never keeps a queued job afterwards.

use sikjipsa_core::types::DbId;
use sqlx::PgPool;

use crate::models::diagnosis::{CompleteDiagnosis, CreateDiagnosisRequest, DiagnosisRequest};
use crate::models::diagnosis_job::NewDiagnosisJob;
use crate::models::status::DiagnosisStatus;

/// Column list for `diagnosis_requests` queries.
const COLUMNS: &str = "\
    id, user_id, image_url, plant_name, scientific_name, confidence, \
    is_healthy, health_confidence, diseases, suggestions, api_response, \
    status_id, error_message, created_at, updated_at";

/// Maximum number of records returned by [`DiagnosisRepo::list_by_user`].
pub const HISTORY_LIMIT: i64 = 50;

/// Provides persistence for diagnosis requests.
pub struct DiagnosisRepo;

impl DiagnosisRepo {
    /// Create a `processing` record and enqueue its job atomically.
    pub async fn create_with_job(
        pool: &PgPool,
        input: &CreateDiagnosisRequest,
        job: &NewDiagnosisJob,
    ) -> Result<DiagnosisRequest, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO diagnosis_requests (user_id, image_url, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let record = sqlx::query_as::<_, DiagnosisRequest>(&query)
            .bind(input.user_id)
            .bind(&input.image_url)
            .bind(DiagnosisStatus::Processing.id())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO diagnosis_jobs (diagnosis_id, image_data_url, latitude, longitude) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(record.id)
        .bind(&job.image_data_url)
        .bind(job.latitude)
        .bind(job.longitude)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Find a diagnosis record by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DiagnosisRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM diagnosis_requests WHERE id = $1");
        sqlx::query_as::<_, DiagnosisRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The user's newest records, all statuses, capped at [`HISTORY_LIMIT`].
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<DiagnosisRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM diagnosis_requests \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, DiagnosisRequest>(&query)
            .bind(user_id)
            .bind(HISTORY_LIMIT)
            .fetch_all(pool)
            .await
    }

    /// Transition `processing -> completed` with the synthesized result.
    ///
    /// Returns `false` if the record was already terminal (or missing), in
    /// which case nothing is written.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        outcome: &CompleteDiagnosis,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "UPDATE diagnosis_requests \
             SET plant_name = $2, scientific_name = $3, confidence = $4, \
                 is_healthy = $5, health_confidence = $6, \
                 diseases = $7, suggestions = $8, api_response = $9, \
                 status_id = $10 \
             WHERE id = $1 AND status_id = $11",
        )
        .bind(id)
        .bind(&outcome.plant_name)
        .bind(&outcome.scientific_name)
        .bind(outcome.confidence)
        .bind(outcome.is_healthy)
        .bind(outcome.health_confidence)
        .bind(&outcome.diseases)
        .bind(&outcome.suggestions)
        .bind(&outcome.api_response)
        .bind(DiagnosisStatus::Completed.id())
        .bind(DiagnosisStatus::Processing.id())
        .execute(&mut *tx)
        .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            Self::delete_job(&mut tx, id).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Transition `processing -> failed` with an error message.
    ///
    /// Returns `false` if the record was already terminal (or missing).
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "UPDATE diagnosis_requests \
             SET status_id = $2, error_message = $3 \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(DiagnosisStatus::Failed.id())
        .bind(error)
        .bind(DiagnosisStatus::Processing.id())
        .execute(&mut *tx)
        .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            Self::delete_job(&mut tx, id).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_job(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        diagnosis_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM diagnosis_jobs WHERE diagnosis_id = $1")
            .bind(diagnosis_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
