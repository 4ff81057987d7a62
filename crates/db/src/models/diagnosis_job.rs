//! Diagnosis job entity model and DTOs (persistent worker queue).

use serde::Serialize;
use sikjipsa_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `diagnosis_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DiagnosisJob {
    pub id: DbId,
    pub diagnosis_id: DbId,
    /// Base64 data URL prepared at intake. Never serialized to clients.
    #[serde(skip_serializing)]
    pub image_data_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Number of times the job has been claimed, including the current claim.
    pub attempts: i32,
    pub locked_by: Option<String>,
    pub locked_at: Option<Timestamp>,
    pub available_at: Timestamp,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for enqueueing the work item alongside a new diagnosis request.
#[derive(Debug, Clone)]
pub struct NewDiagnosisJob {
    pub image_data_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
