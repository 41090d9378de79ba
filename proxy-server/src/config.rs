use std::env;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,https://your-vercel-app-url.vercel.app";

pub struct Config {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub rest_countries_url: String,
    /// Optional `fields` filter for the full-list request
    pub rest_countries_fields: Option<String>,
    pub open_weather_url: String,
    pub opencage_url: String,
    pub exchange_rate_url: String,
    pub weather_api_key: Option<String>,
    pub geocode_api_key: Option<String>,
    pub exchange_rate_api_key: Option<String>,
    pub language: String,
    pub countries_cache_ttl: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
    pub warm_cache: bool,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; missing or unparsable values fall back to defaults.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            allowed_origins: string_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rest_countries_url: string_or("REST_COUNTRIES_URL", "https://restcountries.com/v3.1"),
            rest_countries_fields: secret("REST_COUNTRIES_FIELDS"),
            open_weather_url: string_or(
                "OPEN_WEATHER_URL",
                "https://api.openweathermap.org/data/2.5/weather",
            ),
            opencage_url: string_or("OPENCAGE_URL", "https://api.opencagedata.com/geocode/v1/json"),
            exchange_rate_url: string_or(
                "EXCHANGE_RATE_URL",
                "https://api.exchangerate-api.com/v4/latest",
            ),
            weather_api_key: secret("WEATHER_API_KEY"),
            geocode_api_key: secret("GEOCODE_API_KEY"),
            exchange_rate_api_key: secret("EXCHANGE_RATE_API_KEY"),
            language: string_or("UPSTREAM_LANGUAGE", "tr"),
            countries_cache_ttl: Duration::from_secs(
                lookup("COUNTRIES_CACHE_TTL_SECONDS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2 * 60 * 60), // 2 hours
            ),
            retry_attempts: lookup("RETRY_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_backoff: Duration::from_millis(
                lookup("RETRY_BACKOFF_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            warm_cache: lookup("WARM_CACHE")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
            log_format: string_or("LOG_FORMAT", "pretty"),
        }
    }

    /// Missing keys don't block startup; requests needing them fail at call time.
    pub fn log_key_status(&self) {
        let keys = [
            ("WEATHER_API_KEY", &self.weather_api_key),
            ("GEOCODE_API_KEY", &self.geocode_api_key),
            ("EXCHANGE_RATE_API_KEY", &self.exchange_rate_api_key),
        ];

        for (name, value) in keys {
            if value.is_some() {
                info!(key = name, "Set");
            } else {
                warn!(key = name, "Not set");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.countries_cache_ttl, Duration::from_secs(7200));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_backoff, Duration::from_secs(1));
        assert!(config.weather_api_key.is_none());
        assert!(config.warm_cache);
        assert_eq!(config.language, "tr");
    }

    #[test]
    fn test_overrides_and_blank_secrets() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("WEATHER_API_KEY", "abc"),
            ("GEOCODE_API_KEY", "  "),
            ("WARM_CACHE", "false"),
            ("RETRY_BACKOFF_MS", "250"),
        ]);

        assert_eq!(config.port, 8081);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.weather_api_key.as_deref(), Some("abc"));
        assert!(config.geocode_api_key.is_none());
        assert!(!config.warm_cache);
        assert_eq!(config.retry_backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_unparsable_port_falls_back() {
        let config = config_from(&[("PORT", "not-a-port")]);
        assert_eq!(config.port, 3000);
    }
}
