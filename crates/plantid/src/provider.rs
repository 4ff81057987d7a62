use async_trait::async_trait;

use crate::api::{PlantIdApi, PlantIdError};
use crate::messages::{ImageInput, ProviderResponse};

/// The two classification calls the diagnosis worker depends on.
///
/// [`PlantIdApi`] is the production implementation; tests substitute
/// scripted providers.
#[async_trait]
pub trait PlantDiagnosisProvider: Send + Sync {
    /// Species identification. Failure is advisory for the caller.
    async fn identify(&self, image: &ImageInput) -> Result<ProviderResponse, PlantIdError>;

    /// Health assessment. Failure fails the diagnosis.
    async fn assess_health(&self, image: &ImageInput) -> Result<ProviderResponse, PlantIdError>;
}

#[async_trait]
impl PlantDiagnosisProvider for PlantIdApi {
    async fn identify(&self, image: &ImageInput) -> Result<ProviderResponse, PlantIdError> {
        PlantIdApi::identify(self, image).await
    }

    async fn assess_health(&self, image: &ImageInput) -> Result<ProviderResponse, PlantIdError> {
        PlantIdApi::assess_health(self, image).await
    }
}
