//! Request and response payloads for the Plant.id v3 API.
//!
//! Response structs are lenient (`#[serde(default)]`): the provider omits
//! whole sections depending on the endpoint, and a missing section must not
//! turn a successful call into a parse failure.

use serde::{Deserialize, Serialize};
use sikjipsa_core::diagnosis::{DiseaseCandidate, HealthSignal, PlantCandidate};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The image and optional location sent with both calls.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// `data:image/<subtype>;base64,...`
    pub data_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Health-assessment mode requesting health data only (no identification).
pub const HEALTH_ONLY: &str = "only";

/// JSON body shared by the identification and health-assessment endpoints.
#[derive(Debug, Serialize)]
pub struct AssessmentRequest<'a> {
    pub images: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub similar_images: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub symptoms: bool,
}

impl<'a> AssessmentRequest<'a> {
    /// Species identification with similar-image evidence.
    pub fn identification(image: &'a ImageInput) -> Self {
        Self {
            images: vec![image.data_url.as_str()],
            latitude: image.latitude,
            longitude: image.longitude,
            similar_images: true,
            health: None,
            symptoms: false,
        }
    }

    /// Health probability and disease symptoms, scoped to health-only mode.
    pub fn health_assessment(image: &'a ImageInput) -> Self {
        Self {
            images: vec![image.data_url.as_str()],
            latitude: image.latitude,
            longitude: image.longitude,
            similar_images: true,
            health: Some(HEALTH_ONLY),
            symptoms: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Top-level response of both endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlantIdResponse {
    pub access_token: Option<String>,
    pub model_version: Option<String>,
    pub status: Option<String>,
    pub result: AssessmentResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssessmentResult {
    pub is_plant: Option<BinaryPrediction>,
    pub classification: Option<SuggestionList>,
    pub is_healthy: Option<BinaryPrediction>,
    pub disease: Option<SuggestionList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BinaryPrediction {
    pub probability: f64,
    pub binary: bool,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuggestionList {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    pub probability: f64,
    pub similar_images: Vec<SimilarImage>,
    pub details: Option<SuggestionDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimilarImage {
    pub id: String,
    pub url: String,
    pub similarity: f64,
    pub url_small: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SuggestionDetails {
    pub language: Option<String>,
    pub entity_id: Option<String>,
    pub common_names: Option<Vec<String>>,
}

impl PlantIdResponse {
    fn classification_suggestions(&self) -> &[Suggestion] {
        self.result
            .classification
            .as_ref()
            .map(|c| c.suggestions.as_slice())
            .unwrap_or_default()
    }

    fn disease_suggestions(&self) -> &[Suggestion] {
        self.result
            .disease
            .as_ref()
            .map(|d| d.suggestions.as_slice())
            .unwrap_or_default()
    }

    /// Species candidates in provider order.
    pub fn plant_candidates(&self) -> Vec<PlantCandidate> {
        self.classification_suggestions()
            .iter()
            .map(|s| PlantCandidate {
                name: s.name.clone(),
                probability: s.probability,
            })
            .collect()
    }

    /// Health signal from a health-assessment response.
    ///
    /// A response without an `is_healthy` section is read as healthy with
    /// full confidence; disease suggestions are kept either way.
    pub fn health_signal(&self) -> HealthSignal {
        let (is_healthy, probability) = self
            .result
            .is_healthy
            .as_ref()
            .map(|h| (h.binary, h.probability))
            .unwrap_or((true, 1.0));

        HealthSignal {
            is_healthy,
            probability,
            diseases: self
                .disease_suggestions()
                .iter()
                .map(|s| DiseaseCandidate {
                    name: s.name.clone(),
                    probability: s.probability,
                })
                .collect(),
        }
    }

    /// Count summary used in logs.
    pub fn suggestion_counts(&self) -> (usize, usize) {
        (
            self.classification_suggestions().len(),
            self.disease_suggestions().len(),
        )
    }
}

/// A parsed provider response together with the raw JSON it came from.
///
/// The raw value is what gets snapshotted into `api_response`.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub raw: serde_json::Value,
    pub parsed: PlantIdResponse,
}

impl ProviderResponse {
    /// Parse a raw JSON body.
    pub fn from_raw(raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        let parsed = PlantIdResponse::deserialize(&raw)?;
        Ok(Self { raw, parsed })
    }
}
