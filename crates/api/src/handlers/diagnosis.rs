//! Handlers for the `/diagnosis` resource.
//!
//! Uploads are accepted synchronously and analysed by the background
//! dispatcher; clients poll `/diagnosis/result/{id}` for the outcome.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use sikjipsa_core::diagnosis::{CareSuggestion, DiseaseAssessment};
use sikjipsa_core::error::CoreError;
use sikjipsa_core::image_intake::{
    encode_data_url, parse_coordinate, validate_image_upload, UPLOAD_FOLDER,
    UPLOAD_TRANSFORMATION,
};
use sikjipsa_core::types::{DbId, Timestamp};
use sikjipsa_db::models::diagnosis::{CreateDiagnosisRequest, DiagnosisRequest};
use sikjipsa_db::models::diagnosis_job::NewDiagnosisJob;
use sikjipsa_db::models::status::DiagnosisStatus;
use sikjipsa_db::repositories::DiagnosisRepo;
use sikjipsa_media::ImageUpload;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Multipart field carrying the photo.
const IMAGE_FIELD: &str = "image";

/// Response to an accepted upload.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub message: &'static str,
    pub diagnosis_id: DbId,
    pub status: &'static str,
}

/// Polling snapshot of one diagnosis.
///
/// Results are present only once completed, the error only once failed.
#[derive(Debug, Serialize)]
pub struct DiagnosisResultView {
    pub id: DbId,
    pub status: &'static str,
    pub image_url: String,
    pub plant_name: Option<String>,
    pub scientific_name: Option<String>,
    pub confidence: Option<f64>,
    pub is_healthy: Option<bool>,
    pub health_confidence: Option<f64>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diseases: Option<Vec<DiseaseAssessment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<CareSuggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<DiagnosisRequest> for DiagnosisResultView {
    fn from(record: DiagnosisRequest) -> Self {
        let status = record.status();
        let (diseases, suggestions) = match status {
            DiagnosisStatus::Completed => {
                (Some(record.disease_list()), Some(record.suggestion_list()))
            }
            _ => (None, None),
        };
        let error_message = match status {
            DiagnosisStatus::Failed => record.error_message,
            _ => None,
        };

        Self {
            id: record.id,
            status: status.as_str(),
            image_url: record.image_url,
            plant_name: record.plant_name,
            scientific_name: record.scientific_name,
            confidence: record.confidence,
            is_healthy: record.is_healthy,
            health_confidence: record.health_confidence,
            created_at: record.created_at,
            diseases,
            suggestions,
            error_message,
        }
    }
}

/// History entry: the stored record plus its status label.
#[derive(Debug, Serialize)]
pub struct DiagnosisHistoryEntry {
    #[serde(flatten)]
    pub record: DiagnosisRequest,
    pub status: &'static str,
}

/// POST /api/v1/diagnosis/analyze
///
/// Multipart `image` plus optional `latitude`/`longitude` text fields.
/// Stores the photo, records the request as processing and queues it.
pub async fn analyze_plant(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<AnalyzeResponse>> {
    state.upload_limiter.check(user.user_id)?;

    if !state.config.plant_id.is_configured() {
        return Err(AppError::Core(CoreError::Unavailable(
            "Plant diagnosis service is not configured".into(),
        )));
    }

    let mut image: Option<(String, Vec<u8>)> = None;
    let mut latitude: Option<String> = None;
    let mut longitude: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            // First image part wins; later ones are skipped unread.
            IMAGE_FIELD if image.is_none() => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                image = Some((filename, data.to_vec()));
            }
            "latitude" | "longitude" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if name == "latitude" {
                    latitude = Some(text);
                } else {
                    longitude = Some(text);
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    let (filename, bytes) =
        image.ok_or_else(|| AppError::BadRequest("No image file provided".into()))?;
    validate_image_upload(&filename, bytes.len())?;

    let job = NewDiagnosisJob {
        image_data_url: encode_data_url(&filename, &bytes),
        latitude: parse_coordinate(latitude.as_deref()),
        longitude: parse_coordinate(longitude.as_deref()),
    };

    let hosted = state
        .image_host
        .upload(ImageUpload {
            file_name: filename,
            bytes,
            folder: UPLOAD_FOLDER.to_string(),
            transformation: Some(UPLOAD_TRANSFORMATION.to_string()),
        })
        .await?;

    let record = DiagnosisRepo::create_with_job(
        &state.pool,
        &CreateDiagnosisRequest {
            user_id: user.user_id,
            image_url: hosted.secure_url,
        },
        &job,
    )
    .await?;

    state.diagnosis_queue.notify_one();
    tracing::info!(
        diagnosis_id = record.id,
        user_id = user.user_id,
        "Diagnosis request accepted",
    );

    Ok(Json(AnalyzeResponse {
        message: "Analysis started",
        diagnosis_id: record.id,
        status: DiagnosisStatus::Processing.as_str(),
    }))
}

/// GET /api/v1/diagnosis/result/{id}
///
/// Public read: any caller holding the id can poll it.
pub async fn get_diagnosis_result(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DiagnosisResultView>> {
    let record = DiagnosisRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Diagnosis",
            id,
        }))?;
    Ok(Json(record.into()))
}

/// GET /api/v1/diagnosis/history
///
/// The caller's newest diagnoses, all statuses.
pub async fn get_diagnosis_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<DiagnosisHistoryEntry>>> {
    let records = DiagnosisRepo::list_by_user(&state.pool, user.user_id).await?;
    let entries = records
        .into_iter()
        .map(|record| DiagnosisHistoryEntry {
            status: record.status().as_str(),
            record,
        })
        .collect();
    Ok(Json(entries))
}
