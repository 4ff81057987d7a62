//! Diagnosis request entity model and DTOs.

use serde::Serialize;
use sikjipsa_core::diagnosis::{CareSuggestion, DiseaseAssessment, SynthesizedDiagnosis};
use sikjipsa_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::status::{DiagnosisStatus, StatusId};

/// A row from the `diagnosis_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DiagnosisRequest {
    pub id: DbId,
    pub user_id: DbId,
    pub image_url: String,
    pub plant_name: Option<String>,
    pub scientific_name: Option<String>,
    pub confidence: Option<f64>,
    pub is_healthy: Option<bool>,
    pub health_confidence: Option<f64>,
    pub diseases: Option<serde_json::Value>,
    pub suggestions: Option<serde_json::Value>,
    /// Raw provider snapshot, kept for audit only.
    #[serde(skip_serializing)]
    pub api_response: Option<serde_json::Value>,
    pub status_id: StatusId,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DiagnosisRequest {
    /// Typed status. Unknown ids read as `Processing`, which exposes no results.
    pub fn status(&self) -> DiagnosisStatus {
        DiagnosisStatus::from_id(self.status_id).unwrap_or(DiagnosisStatus::Processing)
    }

    /// Stored disease list, decoded. Empty unless completed.
    pub fn disease_list(&self) -> Vec<DiseaseAssessment> {
        decode_list(self.diseases.as_ref())
    }

    /// Stored suggestion list, decoded. Empty unless completed.
    pub fn suggestion_list(&self) -> Vec<CareSuggestion> {
        decode_list(self.suggestions.as_ref())
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(value: Option<&serde_json::Value>) -> Vec<T> {
    value
        .and_then(|v| {
            serde_json::from_value(v.clone())
                .inspect_err(|e| tracing::warn!(error = %e, "Stored diagnosis list is malformed"))
                .ok()
        })
        .unwrap_or_default()
}

/// DTO for creating a diagnosis request at upload time.
#[derive(Debug, Clone)]
pub struct CreateDiagnosisRequest {
    pub user_id: DbId,
    pub image_url: String,
}

/// Everything written by the `processing -> completed` transition.
#[derive(Debug, Clone)]
pub struct CompleteDiagnosis {
    pub plant_name: String,
    pub scientific_name: Option<String>,
    pub confidence: f64,
    pub is_healthy: bool,
    pub health_confidence: f64,
    pub diseases: serde_json::Value,
    pub suggestions: serde_json::Value,
    pub api_response: serde_json::Value,
}

impl CompleteDiagnosis {
    /// Build the completion DTO from a synthesized result and the raw snapshot.
    pub fn from_synthesis(
        synthesized: &SynthesizedDiagnosis,
        api_response: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            plant_name: synthesized.plant_name.clone(),
            scientific_name: synthesized.scientific_name.clone(),
            confidence: synthesized.confidence,
            is_healthy: synthesized.is_healthy,
            health_confidence: synthesized.health_confidence,
            diseases: serde_json::to_value(&synthesized.diseases)?,
            suggestions: serde_json::to_value(&synthesized.suggestions)?,
            api_response,
        })
    }
}
