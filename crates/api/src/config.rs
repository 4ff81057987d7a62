use sikjipsa_media::CloudinaryConfig;
use sikjipsa_plantid::PlantIdConfig;

use crate::auth::jwt::JwtConfig;
use crate::engine::dispatcher::DispatcherConfig;

/// Default per-user upload quota.
pub const DEFAULT_UPLOAD_RATE_LIMIT_PER_HOUR: u32 = 20;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight diagnoses (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Diagnosis uploads allowed per user per hour (default: `20`).
    pub upload_rate_limit_per_hour: u32,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Classification provider.
    pub plant_id: PlantIdConfig,
    /// Image host credentials.
    pub cloudinary: CloudinaryConfig,
    /// Diagnosis worker pool.
    pub dispatcher: DispatcherConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                       |
    /// | `UPLOAD_RATE_LIMIT_PER_HOUR` | `20`                       |
    ///
    /// Nested configs read their own variables; see [`JwtConfig::from_env`],
    /// [`PlantIdConfig::from_env`], [`CloudinaryConfig::from_env`] and
    /// [`DispatcherConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let upload_rate_limit_per_hour: u32 = std::env::var("UPLOAD_RATE_LIMIT_PER_HOUR")
            .unwrap_or_else(|_| DEFAULT_UPLOAD_RATE_LIMIT_PER_HOUR.to_string())
            .parse()
            .expect("UPLOAD_RATE_LIMIT_PER_HOUR must be a valid u32");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            upload_rate_limit_per_hour,
            jwt: JwtConfig::from_env(),
            plant_id: PlantIdConfig::from_env(),
            cloudinary: CloudinaryConfig::from_env(),
            dispatcher: DispatcherConfig::from_env(),
        }
    }
}
