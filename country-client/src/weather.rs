use common::cache::{CacheStore, TtlCache};
use common::errors::AppError;
use common::http_client::HttpClient;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::ClientConfig;

/// Weather through the proxy, cached per coordinate pair for the session
pub struct WeatherClient {
    config: ClientConfig,
    http: HttpClient,
    cache: Arc<dyn CacheStore<Value>>,
}

impl WeatherClient {
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let cache = Arc::new(TtlCache::<Value>::with_ttl(config.weather_ttl));
        Self::with_cache(config, cache)
    }

    pub fn with_cache(
        config: ClientConfig,
        cache: Arc<dyn CacheStore<Value>>,
    ) -> Result<Self, AppError> {
        let http = HttpClient::new(config.timeout)?;
        Ok(Self {
            config,
            http,
            cache,
        })
    }

    pub fn cache_key(lat: f64, lon: f64) -> String {
        format!("{},{}", lat, lon)
    }

    /// Raw OpenWeather response for the coordinates
    #[instrument(skip(self))]
    pub async fn get_weather(&self, lat: f64, lon: f64) -> Result<Value, AppError> {
        let key = Self::cache_key(lat, lon);
        if let Some(cached) = self.cache.get(&key).await {
            debug!(key = %key, "Weather cache hit");
            return Ok(cached);
        }

        let (lat_param, lon_param) = (lat.to_string(), lon.to_string());
        let weather: Value = self
            .http
            .get_json_with_query(
                &self.config.proxy("/api/weather"),
                &[("lat", lat_param.as_str()), ("lon", lon_param.as_str())],
            )
            .await?;

        self.cache.set(&key, weather.clone()).await;
        Ok(weather)
    }
}

/// The fields the weather block displays
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    pub location: Option<String>,
    pub temperature: f64,
    pub feels_like: Option<f64>,
    pub humidity: Option<u64>,
    pub wind_speed: Option<f64>,
    pub description: String,
    pub icon: Option<String>,
}

impl WeatherSummary {
    pub fn from_response(body: &Value) -> Result<Self, AppError> {
        let temperature = body
            .pointer("/main/temp")
            .and_then(Value::as_f64)
            .ok_or_else(|| AppError::data_shape("Weather response has no temperature"))?;

        Ok(Self {
            location: body.get("name").and_then(Value::as_str).map(str::to_string),
            temperature,
            feels_like: body.pointer("/main/feels_like").and_then(Value::as_f64),
            humidity: body.pointer("/main/humidity").and_then(Value::as_u64),
            wind_speed: body.pointer("/wind/speed").and_then(Value::as_f64),
            description: body
                .pointer("/weather/0/description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            icon: body
                .pointer("/weather/0/icon")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Terminal symbol for the OpenWeather icon code
    pub fn symbol(&self) -> &'static str {
        let code = self.icon.as_deref().unwrap_or_default();
        match code.get(..2) {
            Some("01") => "☀",
            Some("02") | Some("03") | Some("04") => "☁",
            Some("09") | Some("10") => "☂",
            Some("11") => "⚡",
            Some("13") => "❄",
            Some("50") => "≋",
            _ => "·",
        }
    }
}
