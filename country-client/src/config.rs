use std::env;
use std::time::Duration;

/// Endpoints and cache policy for the client data layer
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Same-origin proxy, the primary source
    pub proxy_url: String,
    /// Direct third-party full list, the backup source
    pub backup_url: String,
    /// Direct third-party API root for name and region lookups
    pub api_base_url: String,
    pub countries_ttl: Duration,
    pub weather_ttl: Duration,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://localhost:3000".to_string(),
            backup_url: "https://restcountries.com/v3.1/all".to_string(),
            api_base_url: "https://restcountries.com/v3.1".to_string(),
            countries_ttl: Duration::from_secs(2 * 60 * 60), // 2 hours
            weather_ttl: Duration::from_secs(10 * 60),
            timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            proxy_url: env::var("COUNTRY_PROXY_URL").unwrap_or(defaults.proxy_url),
            backup_url: env::var("COUNTRY_BACKUP_URL").unwrap_or(defaults.backup_url),
            api_base_url: env::var("COUNTRY_API_BASE_URL").unwrap_or(defaults.api_base_url),
            ..defaults
        }
    }

    /// Points every source at one base URL; used when testing against a single mock.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            proxy_url: base.to_string(),
            backup_url: format!("{}/v3.1/all", base),
            api_base_url: format!("{}/v3.1", base),
            ..Self::default()
        }
    }

    pub(crate) fn proxy(&self, path: &str) -> String {
        format!("{}{}", self.proxy_url.trim_end_matches('/'), path)
    }

    pub(crate) fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}
