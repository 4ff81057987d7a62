//! One diagnosis run: identification, health assessment, synthesis.

use serde_json::json;
use sikjipsa_core::diagnosis::synthesize;
use sikjipsa_core::types::DbId;
use sikjipsa_db::models::diagnosis::CompleteDiagnosis;
use sikjipsa_plantid::{ImageInput, PlantDiagnosisProvider};

/// Result of running the provider calls for one diagnosis.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// Everything needed for the `processing -> completed` transition.
    Completed(Box<CompleteDiagnosis>),
    /// The diagnosis cannot complete; the message is stored on the record.
    Failed(String),
}

/// Run identification then health assessment and synthesize the result.
///
/// Identification failures are logged and fall back to the generic plant
/// name. A health-assessment failure fails the diagnosis.
pub async fn analyze(
    provider: &dyn PlantDiagnosisProvider,
    diagnosis_id: DbId,
    image: &ImageInput,
) -> AnalysisOutcome {
    let identification = match provider.identify(image).await {
        Ok(response) => Some(response),
        Err(e) => {
            tracing::warn!(diagnosis_id, error = %e, "Plant identification failed, using fallback");
            None
        }
    };

    let health = match provider.assess_health(image).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(diagnosis_id, error = %e, "Health assessment failed");
            return AnalysisOutcome::Failed(format!("Health assessment failed: {e}"));
        }
    };

    let candidates = identification.as_ref().map(|r| r.parsed.plant_candidates());
    let signal = health.parsed.health_signal();
    let synthesized = synthesize(candidates.as_deref(), Some(&signal));

    let snapshot = json!({
        "identification": identification.map(|r| r.raw),
        "health": health.raw,
    });

    match CompleteDiagnosis::from_synthesis(&synthesized, snapshot) {
        Ok(complete) => {
            tracing::info!(
                diagnosis_id,
                plant_name = %complete.plant_name,
                is_healthy = complete.is_healthy,
                disease_count = synthesized.diseases.len(),
                "Diagnosis synthesized",
            );
            AnalysisOutcome::Completed(Box::new(complete))
        }
        Err(e) => AnalysisOutcome::Failed(format!("Failed to encode diagnosis result: {e}")),
    }
}
