use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::Country;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument};

use crate::config::Config;

const LIST_TIMEOUT: Duration = Duration::from_secs(10);
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const PASSTHROUGH_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream REST clients with the secret keys injected server-side.
///
/// Only the full country list goes through the retrying client; lookups and
/// pass-throughs are single-shot.
pub struct UpstreamClient {
    list_client: HttpClient,
    lookup_client: HttpClient,
    passthrough_client: HttpClient,
    rest_countries_url: String,
    rest_countries_fields: Option<String>,
    open_weather_url: String,
    opencage_url: String,
    exchange_rate_url: String,
    weather_api_key: Option<String>,
    geocode_api_key: Option<String>,
    exchange_rate_api_key: Option<String>,
    language: String,
}

impl UpstreamClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            list_client: HttpClient::new(LIST_TIMEOUT)?
                .with_retry(config.retry_attempts, config.retry_backoff),
            lookup_client: HttpClient::new(LOOKUP_TIMEOUT)?,
            passthrough_client: HttpClient::new(PASSTHROUGH_TIMEOUT)?,
            rest_countries_url: trim_base(&config.rest_countries_url),
            rest_countries_fields: config.rest_countries_fields.clone(),
            open_weather_url: config.open_weather_url.clone(),
            opencage_url: config.opencage_url.clone(),
            exchange_rate_url: trim_base(&config.exchange_rate_url),
            weather_api_key: config.weather_api_key.clone(),
            geocode_api_key: config.geocode_api_key.clone(),
            exchange_rate_api_key: config.exchange_rate_api_key.clone(),
            language: config.language.clone(),
        })
    }

    /// Raw full list; the caller validates the shape.
    #[instrument(skip(self))]
    pub async fn fetch_all_countries(&self) -> Result<Value, AppError> {
        info!("Fetching full country list from upstream");
        let url = format!("{}/all", self.rest_countries_url);
        match self.rest_countries_fields.as_deref() {
            Some(fields) => {
                self.list_client
                    .get_json_with_query(&url, &[("fields", fields)])
                    .await
            }
            None => self.list_client.get_json(&url).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn countries_by_name(&self, name: &str) -> Result<Vec<Country>, AppError> {
        let url = format!(
            "{}/name/{}",
            self.rest_countries_url,
            urlencoding::encode(name)
        );
        self.lookup_client.get_json(&url).await
    }

    #[instrument(skip(self), fields(count = codes.len()))]
    pub async fn countries_by_codes(&self, codes: &[String]) -> Result<Vec<Country>, AppError> {
        let url = format!("{}/alpha", self.rest_countries_url);
        let joined = codes.join(",");
        self.lookup_client
            .get_json_with_query(&url, &[("codes", joined.as_str())])
            .await
    }

    #[instrument(skip(self))]
    pub async fn weather(&self, lat: &str, lon: &str) -> Result<Value, AppError> {
        let key = self.weather_api_key.as_deref().unwrap_or_default();
        self.passthrough_client
            .get_json_with_query(
                &self.open_weather_url,
                &[
                    ("lat", lat),
                    ("lon", lon),
                    ("appid", key),
                    ("units", "metric"),
                    ("lang", self.language.as_str()),
                ],
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn geocode(&self, lat: &str, lng: &str) -> Result<Value, AppError> {
        let key = self.geocode_api_key.as_deref().unwrap_or_default();
        let q = format!("{}+{}", lat, lng);
        self.passthrough_client
            .get_json_with_query(
                &self.opencage_url,
                &[
                    ("q", q.as_str()),
                    ("key", key),
                    ("language", self.language.as_str()),
                ],
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn exchange_rates(&self, from: &str) -> Result<Value, AppError> {
        let key = self.exchange_rate_api_key.as_deref().unwrap_or_default();
        let url = format!("{}/{}", self.exchange_rate_url, urlencoding::encode(from));
        self.passthrough_client
            .get_json_with_query(&url, &[("apikey", key)])
            .await
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
