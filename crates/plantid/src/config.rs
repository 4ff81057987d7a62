/// Default provider base URL (Plant.id API v3).
pub const DEFAULT_BASE_URL: &str = "https://plant.id/api/v3";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Classification provider configuration.
#[derive(Debug, Clone)]
pub struct PlantIdConfig {
    /// Provider API key. `None` disables diagnosis uploads (503).
    pub api_key: Option<String>,
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Timeout applied to each call individually.
    pub timeout_secs: u64,
}

impl PlantIdConfig {
    /// Load provider configuration from environment variables.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `PLANT_AI_API_KEY`      | unset                      |
    /// | `PLANT_AI_API_URL`      | `https://plant.id/api/v3`  |
    /// | `PLANT_AI_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let api_key = std::env::var("PLANT_AI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let base_url = std::env::var("PLANT_AI_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs: u64 = std::env::var("PLANT_AI_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("PLANT_AI_TIMEOUT_SECS must be a valid u64");

        Self {
            api_key,
            base_url,
            timeout_secs,
        }
    }

    /// Whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
