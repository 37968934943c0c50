//! Configuration for the synchronizer.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;
use tracing::{info, warn};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5049";

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "REKINDLE_API_URL";
/// Environment variable overriding the default page size.
pub const ENV_PAGE_SIZE: &str = "REKINDLE_PAGE_SIZE";
/// Environment variable holding the bearer token.
pub const ENV_API_TOKEN: &str = "REKINDLE_API_TOKEN";

/// Configuration for paged fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Page size used by mount and refresh.
    pub default_page_size: u32,
    /// Bearer token attached to every request.
    pub bearer_token: Option<String>,
    /// Request timeout, applied by the HTTP client.
    pub timeout: Duration,
}

impl SyncConfig {
    /// Creates a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            default_page_size: DEFAULT_PAGE_SIZE,
            bearer_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the default page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets the bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, falling back to defaults
    /// for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SyncResult<Self> {
        let base_url = lookup(ENV_API_URL).unwrap_or_else(|| {
            info!("{ENV_API_URL} not set, using default: {DEFAULT_BASE_URL}");
            DEFAULT_BASE_URL.to_string()
        });

        let mut config = Self::new(base_url);

        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            config.default_page_size = raw.trim().parse().map_err(|e| {
                warn!("Invalid {ENV_PAGE_SIZE} value {raw:?}: {e}");
                SyncError::Config(format!("{ENV_PAGE_SIZE}: {e}"))
            })?;
        }

        config.bearer_token = lookup(ENV_API_TOKEN).filter(|t| !t.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> SyncResult<()> {
        if self.base_url.is_empty() {
            return Err(SyncError::Config("base URL is empty".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SyncError::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.default_page_size == 0 {
            return Err(SyncError::Config("page size must be positive".into()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("https://api.example.com/")
            .with_page_size(50)
            .with_bearer_token("tok")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.bearer_token.as_deref(), Some("tok"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.bearer_token, None);
    }

    #[test]
    fn env_overrides() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "https://rekindle.example.com"),
            (ENV_PAGE_SIZE, " 10 "),
            (ENV_API_TOKEN, "secret"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://rekindle.example.com");
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.bearer_token.as_deref(), Some("secret"));
    }

    #[test]
    fn env_falls_back_to_defaults() {
        let config = SyncConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn env_rejects_bad_page_size() {
        let err = SyncConfig::from_lookup(lookup_from(&[(ENV_PAGE_SIZE, "lots")])).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));

        let err = SyncConfig::from_lookup(lookup_from(&[(ENV_PAGE_SIZE, "0")])).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn validate_rejects_non_http() {
        assert!(SyncConfig::new("").validate().is_err());
        assert!(SyncConfig::new("ftp://files").validate().is_err());
    }
}
