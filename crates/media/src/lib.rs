//! Image hosting for uploaded diagnosis photos.
//!
//! The API layer talks to [`ImageHost`]; [`cloudinary::CloudinaryHost`] is the
//! production implementation.

use async_trait::async_trait;

pub mod cloudinary;

pub use cloudinary::{CloudinaryConfig, CloudinaryHost};

/// An image to store on the hosting service.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Destination folder on the host.
    pub folder: String,
    /// Host-side transformation applied on upload.
    pub transformation: Option<String>,
}

/// A stored image.
#[derive(Debug, Clone, PartialEq)]
pub struct HostedImage {
    /// Durable HTTPS URL of the stored image.
    pub secure_url: String,
    pub public_id: String,
}

/// Errors from the image-hosting layer.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Credentials are missing.
    #[error("Image hosting is not configured")]
    NotConfigured,

    /// The HTTP request itself failed.
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The host returned a non-2xx status code.
    #[error("Image host error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Storage backend for uploaded images.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image and return its durable URL.
    async fn upload(&self, image: ImageUpload) -> Result<HostedImage, MediaError>;
}
