//! Plant.id v3 client.
//!
//! Wraps the identification and health-assessment endpoints used by the
//! diagnosis worker, and converts their payloads into the synthesis inputs
//! defined in `sikjipsa_core::diagnosis`.

pub mod api;
pub mod config;
pub mod messages;
pub mod provider;

pub use api::{PlantIdApi, PlantIdError};
pub use config::PlantIdConfig;
pub use messages::{ImageInput, PlantIdResponse, ProviderResponse};
pub use provider::PlantDiagnosisProvider;
