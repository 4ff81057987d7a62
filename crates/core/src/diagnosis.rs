//! Diagnosis synthesis: merging identification and health-assessment
//! results into the fields stored on a diagnosis request.
//!
//! The classification client converts provider payloads into the input
//! types below ([`PlantCandidate`], [`HealthSignal`]); [`synthesize`] then
//! applies the threshold and fallback policies.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Disease suggestions below this provider probability are dropped.
pub const DISEASE_PROBABILITY_THRESHOLD: f64 = 0.10;

/// Display name used when identification failed or returned nothing.
pub const FALLBACK_PLANT_NAME: &str = "식물";

/// Confidence (percent) paired with [`FALLBACK_PLANT_NAME`].
pub const FALLBACK_CONFIDENCE: f64 = 50.0;

/// Health confidence (percent) used when no health signal is available.
pub const DEFAULT_HEALTH_CONFIDENCE: f64 = 100.0;

/// Treatment note attached to every detected disease.
pub const EXPERT_TREATMENT_NOTE: &str = "전문가의 조언을 구하시기 바랍니다.";

/// Suggestion categories.
pub const CATEGORY_DISEASE_TREATMENT: &str = "disease_treatment";
pub const CATEGORY_GENERAL: &str = "general";
pub const CATEGORY_WATERING: &str = "watering";
pub const CATEGORY_LIGHTING: &str = "lighting";
pub const CATEGORY_NUTRITION: &str = "nutrition";

/// Generic care advice, appended in this order.
const GENERIC_CARE: [(&str, &str); 4] = [
    (CATEGORY_GENERAL, "식물이 건강한 상태로 보입니다."),
    (CATEGORY_WATERING, "적절한 물주기를 유지하세요."),
    (CATEGORY_LIGHTING, "밝은 간접광에서 관리하세요."),
    (CATEGORY_NUTRITION, "한 달에 한 번 액체비료를 주면 좋습니다."),
];

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One species suggestion from the identification call, in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantCandidate {
    /// Provider suggestion name (a scientific name for Plant.id).
    pub name: String,
    /// Probability in `[0, 1]`.
    pub probability: f64,
}

/// One disease suggestion from the health-assessment call.
#[derive(Debug, Clone, PartialEq)]
pub struct DiseaseCandidate {
    pub name: String,
    /// Probability in `[0, 1]`.
    pub probability: f64,
}

/// Health-assessment outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSignal {
    pub is_healthy: bool,
    /// Probability in `[0, 1]` that the plant is healthy.
    pub probability: f64,
    pub diseases: Vec<DiseaseCandidate>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// A detected disease as stored in `diagnosis_requests.diseases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseAssessment {
    pub disease_name: String,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
    pub description: String,
    pub treatment: String,
}

/// A care suggestion as stored in `diagnosis_requests.suggestions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareSuggestion {
    pub category: String,
    pub message: String,
}

/// Every derived field written when a diagnosis completes.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedDiagnosis {
    pub plant_name: String,
    pub scientific_name: Option<String>,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
    pub is_healthy: bool,
    /// Percentage in `[0, 100]`.
    pub health_confidence: f64,
    pub diseases: Vec<DiseaseAssessment>,
    pub suggestions: Vec<CareSuggestion>,
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Convert a `[0, 1]` probability into a `[0, 100]` percentage.
pub fn to_percent(probability: f64) -> f64 {
    probability * 100.0
}

/// Merge identification candidates and the health signal.
///
/// `identification` is `None` when the identification call failed. Only the
/// first candidate is used; the provider already ranks them.
pub fn synthesize(
    identification: Option<&[PlantCandidate]>,
    health: Option<&HealthSignal>,
) -> SynthesizedDiagnosis {
    let (plant_name, scientific_name, confidence) = match identification.and_then(|c| c.first())
    {
        Some(top) => (
            top.name.clone(),
            Some(top.name.clone()),
            to_percent(top.probability),
        ),
        None => (FALLBACK_PLANT_NAME.to_string(), None, FALLBACK_CONFIDENCE),
    };

    let (is_healthy, health_confidence) = match health {
        Some(h) => (h.is_healthy, to_percent(h.probability)),
        None => (true, DEFAULT_HEALTH_CONFIDENCE),
    };

    let diseases: Vec<DiseaseAssessment> = health
        .map(|h| h.diseases.as_slice())
        .unwrap_or_default()
        .iter()
        .filter(|d| d.probability >= DISEASE_PROBABILITY_THRESHOLD)
        .map(assess_disease)
        .collect();

    let suggestions = build_suggestions(is_healthy, &diseases);

    SynthesizedDiagnosis {
        plant_name,
        scientific_name,
        confidence,
        is_healthy,
        health_confidence,
        diseases,
        suggestions,
    }
}

fn assess_disease(candidate: &DiseaseCandidate) -> DiseaseAssessment {
    let pct = to_percent(candidate.probability);
    DiseaseAssessment {
        disease_name: candidate.name.clone(),
        confidence: pct,
        description: format!("{pct:.1}% 확률로 감지된 질병입니다"),
        treatment: EXPERT_TREATMENT_NOTE.to_string(),
    }
}

/// Disease-specific advice first, then the generic set when the plant is
/// healthy or nothing cleared the threshold. The two are not exclusive.
fn build_suggestions(is_healthy: bool, diseases: &[DiseaseAssessment]) -> Vec<CareSuggestion> {
    let mut suggestions: Vec<CareSuggestion> = diseases
        .iter()
        .map(|d| CareSuggestion {
            category: CATEGORY_DISEASE_TREATMENT.to_string(),
            message: format!(
                "{} 증상이 감지되었습니다. {EXPERT_TREATMENT_NOTE}",
                d.disease_name
            ),
        })
        .collect();

    if is_healthy || diseases.is_empty() {
        suggestions.extend(GENERIC_CARE.iter().map(|(category, message)| CareSuggestion {
            category: (*category).to_string(),
            message: (*message).to_string(),
        }));
    }

    suggestions
}
