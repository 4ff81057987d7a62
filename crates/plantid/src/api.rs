//! REST client for the Plant.id HTTP endpoints.
//!
//! Every call posts a JSON body with the `Api-Key` header and is bounded by
//! the configured timeout. Transport failures, non-2xx statuses and bodies
//! that do not parse are all reported as [`PlantIdError`].

use std::time::Duration;

use serde::Serialize;

use crate::config::PlantIdConfig;
use crate::messages::{AssessmentRequest, ImageInput, ProviderResponse};

/// Header carrying the provider API key.
pub const API_KEY_HEADER: &str = "Api-Key";

/// Error bodies longer than this are truncated before being stored.
const MAX_ERROR_BODY_CHARS: usize = 1000;

/// Errors from the Plant.id API layer.
#[derive(Debug, thiserror::Error)]
pub enum PlantIdError {
    /// No API key configured.
    #[error("Plant.id API key is not configured")]
    NotConfigured,

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated, for debugging.
        body: String,
    },

    /// The body was not the JSON shape we expect.
    #[error("failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// HTTP client for the Plant.id API.
#[derive(Debug, Clone)]
pub struct PlantIdApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PlantIdApi {
    /// Build a client from configuration.
    ///
    /// Fails with [`PlantIdError::NotConfigured`] when no API key is set.
    pub fn new(config: &PlantIdConfig) -> Result<Self, PlantIdError> {
        let api_key = config.api_key.clone().ok_or(PlantIdError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// `POST /identification`: species classification with similar images.
    pub async fn identify(&self, image: &ImageInput) -> Result<ProviderResponse, PlantIdError> {
        let body = AssessmentRequest::identification(image);
        self.post("identification", &[("details", "common_names")], &body)
            .await
    }

    /// `POST /health_assessment`: health probability and disease suggestions.
    pub async fn assess_health(
        &self,
        image: &ImageInput,
    ) -> Result<ProviderResponse, PlantIdError> {
        let body = AssessmentRequest::health_assessment(image);
        self.post("health_assessment", &[], &body).await
    }

    // ---- private helpers ----

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<ProviderResponse, PlantIdError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::info!(url = %url, "Calling Plant.id API");

        let response = self
            .client
            .post(&url)
            .query(query)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(url = %url, status = status.as_u16(), "Plant.id API error");
            return Err(PlantIdError::Api {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&text).inspect_err(|e| {
            tracing::error!(url = %url, error = %e, "Failed to parse Plant.id API response");
        })?;
        let parsed = ProviderResponse::from_raw(raw)?;

        let (classification_count, disease_count) = parsed.parsed.suggestion_counts();
        tracing::info!(
            url = %url,
            status = ?parsed.parsed.status,
            classification_count,
            disease_count,
            "Plant.id API response received",
        );

        Ok(parsed)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
