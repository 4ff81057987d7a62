//! Cloudinary signed-upload client.
//!
//! Uploads go to `POST {api_url}/{cloud_name}/image/upload` as multipart
//! forms. The signature is the SHA-256 hex digest of the alphabetically
//! sorted `key=value` pairs joined by `&`, followed by the API secret.
//! The Cloudinary account must be set to SHA-256 signatures.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{HostedImage, ImageHost, ImageUpload, MediaError};

/// Default Cloudinary API base.
pub const DEFAULT_API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Cloudinary credentials.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API base without a trailing slash.
    pub api_url: String,
}

impl CloudinaryConfig {
    /// Load credentials from environment variables.
    ///
    /// | Env Var                 | Default                           |
    /// |-------------------------|-----------------------------------|
    /// | `CLOUDINARY_CLOUD_NAME` | empty                             |
    /// | `CLOUDINARY_API_KEY`    | empty                             |
    /// | `CLOUDINARY_API_SECRET` | empty                             |
    /// | `CLOUDINARY_API_URL`    | `https://api.cloudinary.com/v1_1` |
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default().trim().to_string();
        let api_url = std::env::var("CLOUDINARY_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.into());

        Self {
            cloud_name: var("CLOUDINARY_CLOUD_NAME"),
            api_key: var("CLOUDINARY_API_KEY"),
            api_secret: var("CLOUDINARY_API_SECRET"),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// All three credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

/// [`ImageHost`] backed by Cloudinary.
pub struct CloudinaryHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.api_url, self.config.cloud_name
        )
    }
}

/// Compute an upload signature over `params` (any order).
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, image: ImageUpload) -> Result<HostedImage, MediaError> {
        if !self.config.is_configured() {
            return Err(MediaError::NotConfigured);
        }

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let transformation = image.transformation.unwrap_or_default();
        let signed = [
            ("folder", image.folder.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", transformation.as_str()),
        ];
        let signature = sign_params(&signed, &self.config.api_secret);

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(image.bytes).file_name(image.file_name),
            )
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (key, value) in signed {
            if !value.is_empty() {
                form = form.text(key, value.to_string());
            }
        }

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::error!(status = status.as_u16(), "Image upload rejected");
            return Err(MediaError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        tracing::debug!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(HostedImage {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}
