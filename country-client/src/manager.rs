use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::Country;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ClientConfig;
use crate::inflight::InFlight;
use crate::storage::{KeyValueStore, PersistentCache};

/// Storage key of the persisted country list
pub const COUNTRIES_STORAGE_KEY: &str = "countriesCache";

const COUNTRIES_REQUEST: &str = "countries";

/// Client-side country data layer.
///
/// Holds the in-memory list and resolves it from the persistent cache, the
/// proxy (primary) or the direct upstream (backup), in that order.
pub struct CountryManager {
    config: ClientConfig,
    http: HttpClient,
    countries: RwLock<Arc<Vec<Country>>>,
    cache: PersistentCache<Vec<Country>>,
    in_flight: InFlight,
}

impl CountryManager {
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, AppError> {
        let http = HttpClient::new(config.timeout)?;
        let cache = PersistentCache::new(store, COUNTRIES_STORAGE_KEY, config.countries_ttl);

        Ok(Self {
            config,
            http,
            countries: RwLock::new(Arc::new(Vec::new())),
            cache,
            in_flight: InFlight::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current in-memory list, possibly empty
    pub fn countries(&self) -> Arc<Vec<Country>> {
        self.countries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, countries: Vec<Country>) -> Arc<Vec<Country>> {
        let countries = Arc::new(countries);
        *self.countries.write().unwrap_or_else(PoisonError::into_inner) = countries.clone();
        countries
    }

    fn persist(&self, countries: &Vec<Country>) {
        if let Err(e) = self.cache.write(countries) {
            warn!(error = %e, "Failed to update persistent cache");
        }
    }

    /// Loads the country list, logging instead of failing. Returns whether any list was loaded.
    pub async fn initialize(&self) -> bool {
        match self.load_countries().await {
            Ok(countries) => {
                info!(count = countries.len(), "Countries loaded");
                true
            }
            Err(e) => {
                error!(error = %e, "Country data could not be loaded");
                false
            }
        }
    }

    /// Resolves the country list: in-flight stale read, fresh persistent
    /// cache, primary source, backup source, then persisted data of any age.
    #[instrument(skip(self))]
    pub async fn load_countries(&self) -> Result<Arc<Vec<Country>>, AppError> {
        if self.in_flight.is_active(COUNTRIES_REQUEST) {
            debug!("Countries fetch already in flight, serving current list");
            return Ok(self.countries());
        }

        if let Some(cached) = self.cache.read_fresh() {
            return Ok(self.install(cached));
        }

        let Some(_guard) = self.in_flight.try_claim(COUNTRIES_REQUEST) else {
            debug!("Lost the in-flight claim, serving current list");
            return Ok(self.countries());
        };

        match self.fetch_primary().await {
            Ok(countries) => {
                self.persist(&countries);
                return Ok(self.install(countries));
            }
            Err(e) => warn!(error = %e, "Primary source failed, trying backup source"),
        }

        match self.fetch_backup().await {
            Ok(countries) => {
                self.persist(&countries);
                Ok(self.install(countries))
            }
            Err(e) => {
                error!(error = %e, "Backup source failed");
                match self.cache.read_any() {
                    Some(cached) => {
                        warn!(count = cached.len(), "Serving persisted countries regardless of age");
                        Ok(self.install(cached))
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn fetch_primary(&self) -> Result<Vec<Country>, AppError> {
        self.http.get_json(&self.config.proxy("/api/countries")).await
    }

    async fn fetch_backup(&self) -> Result<Vec<Country>, AppError> {
        self.http.get_json(&self.config.backup_url).await
    }

    /// Case-insensitive match on common or official name, in memory only
    pub fn find_country(&self, name: &str) -> Option<Country> {
        self.countries()
            .iter()
            .find(|country| country.matches_name(name))
            .cloned()
    }

    /// Local list first; on a miss, the first result of a name search.
    #[instrument(skip(self))]
    pub async fn get_country(&self, name: &str) -> Result<Country, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Please enter a country name"));
        }

        if let Some(country) = self.find_country(name) {
            debug!(name = %name, "Country found locally");
            return Ok(country);
        }

        let url = self
            .config
            .api(&format!("/name/{}", urlencoding::encode(name)));
        let found: Vec<Country> = self.http.get_json(&url).await.map_err(|e| {
            if e.upstream_status() == Some(404) {
                AppError::not_found("Country not found")
            } else {
                e
            }
        })?;

        found
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Country not found"))
    }

    /// Resolves border codes locally when all are known, otherwise with one
    /// batched request. Never fails: a network error yields the local subset.
    #[instrument(skip(self, borders), fields(count = borders.len()))]
    pub async fn get_neighbor_countries<S: AsRef<str>>(&self, borders: &[S]) -> Vec<Country> {
        if borders.is_empty() {
            return Vec::new();
        }

        let countries = self.countries();
        let local: Vec<Country> = borders
            .iter()
            .filter_map(|code| {
                countries
                    .iter()
                    .find(|c| c.cca3() == Some(code.as_ref()))
                    .cloned()
            })
            .collect();

        if local.len() == borders.len() {
            return local;
        }

        let codes: Vec<String> = borders
            .iter()
            .map(|code| urlencoding::encode(code.as_ref()).into_owned())
            .collect();
        let url = self
            .config
            .proxy(&format!("/api/countries/codes/{}", codes.join(",")));

        match self.http.get_json::<Value>(&url).await {
            Ok(Value::Array(items)) => items.into_iter().map(Country::from_value).collect(),
            Ok(_) => {
                warn!("Neighbor lookup returned a non-array body");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, resolved = local.len(), "Neighbor countries fetch failed, using local subset");
                local
            }
        }
    }

    /// All countries of a region/continent, straight from the upstream API
    #[instrument(skip(self))]
    pub async fn countries_by_region(&self, region: &str) -> Result<Vec<Country>, AppError> {
        let region = region.trim();
        if region.is_empty() {
            return Err(AppError::validation("Please select a continent"));
        }

        let url = self
            .config
            .api(&format!("/region/{}", urlencoding::encode(region)));
        self.http.get_json(&url).await
    }

    /// Reverse-geocodes coordinates to a country name through the proxy
    #[instrument(skip(self))]
    pub async fn locate(&self, lat: f64, lng: f64) -> Result<String, AppError> {
        let (lat, lng) = (lat.to_string(), lng.to_string());
        let body: Value = self
            .http
            .get_json_with_query(
                &self.config.proxy("/api/geocode"),
                &[("lat", lat.as_str()), ("lng", lng.as_str())],
            )
            .await?;

        body.pointer("/results/0/components/country")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::data_shape("No country found for these coordinates"))
    }
}
