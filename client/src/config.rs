use serde::{Deserialize, Serialize};

/// Environment variable the base URL is read from.
pub const BASE_URL_ENV: &str = "OAR_SERVICE_BASE_URL";

/// Maximum page size the results service accepts.
pub const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub default_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            default_limit: 250,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the base URL from `OAR_SERVICE_BASE_URL`. When unset the base
    /// URL is empty, which `validate` rejects; configuring the service
    /// location is deliberately the deployment's job.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_default();
        Self::default().with_base_url(base_url)
    }

    /// Sets the base URL, stripping a single trailing slash so endpoint
    /// paths can be appended verbatim.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if base_url.ends_with('/') {
            base_url.pop();
        }
        self.base_url = base_url;
        self
    }

    pub fn with_default_limit(mut self, default_limit: u32) -> Self {
        self.default_limit = default_limit;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("base URL must start with http:// or https://".to_string());
        }

        if self.default_limit == 0 {
            return Err("default limit must be greater than 0".to_string());
        }

        if self.default_limit > MAX_LIMIT {
            return Err(format!("maximum allowed limit is {}", MAX_LIMIT));
        }

        Ok(())
    }
}
