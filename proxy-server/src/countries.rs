use common::cache::CacheStore;
use common::errors::AppError;
use common::models::Country;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::api_client::UpstreamClient;

pub const COUNTRIES_CACHE_KEY: &str = "countries:all";

/// Shared cached country list
pub type CountryList = Arc<Vec<Country>>;

/// Whether a served list came from a fresh fetch/cache hit or a stale fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

impl Freshness {
    /// Client-side TTL hint. Shorter than the server TTL so clients revalidate first.
    pub fn cache_control(self) -> &'static str {
        match self {
            Freshness::Fresh => "public, max-age=1800",
            Freshness::Stale => "public, max-age=300",
        }
    }
}

pub struct CountryService {
    cache: Arc<dyn CacheStore<CountryList>>,
    upstream: Arc<UpstreamClient>,
    refresh_lock: Mutex<()>,
}

impl CountryService {
    pub fn new(cache: Arc<dyn CacheStore<CountryList>>, upstream: Arc<UpstreamClient>) -> Self {
        Self {
            cache,
            upstream,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Serves the cached list while fresh, refetches otherwise, and falls back
    /// to any stale copy if the upstream fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<(CountryList, Freshness), AppError> {
        if let Some(countries) = self.cache.get(COUNTRIES_CACHE_KEY).await {
            info!(count = countries.len(), "Serving from server cache");
            return Ok((countries, Freshness::Fresh));
        }

        // A stale copy is served at once while another request refreshes.
        // Without one, concurrent misses wait and re-read the cache.
        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(stale) = self.cache.get_stale(COUNTRIES_CACHE_KEY).await {
                    info!(count = stale.len(), "Refresh in progress, serving stale cache");
                    return Ok((stale, Freshness::Stale));
                }
                self.refresh_lock.lock().await
            }
        };
        if let Some(countries) = self.cache.get(COUNTRIES_CACHE_KEY).await {
            info!(count = countries.len(), "Serving from cache refreshed by a concurrent request");
            return Ok((countries, Freshness::Fresh));
        }

        match self.refresh().await {
            Ok(countries) => Ok((countries, Freshness::Fresh)),
            Err(e) => {
                error!(error = %e, "Countries API error");
                match self.cache.get_stale(COUNTRIES_CACHE_KEY).await {
                    Some(stale) => {
                        warn!(count = stale.len(), "Serving stale cache after error");
                        Ok((stale, Freshness::Stale))
                    }
                    None => Err(AppError::upstream("Country data could not be retrieved", e)),
                }
            }
        }
    }

    async fn refresh(&self) -> Result<CountryList, AppError> {
        let raw = self.upstream.fetch_all_countries().await?;
        let countries = Arc::new(normalize_countries(raw)?);
        self.cache
            .set(COUNTRIES_CACHE_KEY, countries.clone())
            .await;
        info!(count = countries.len(), "Country cache refreshed");
        Ok(countries)
    }

    /// Prefills the list cache; failures are only logged.
    pub async fn warm(&self) {
        match self.list().await {
            Ok((countries, _)) => info!(count = countries.len(), "Country cache warmed"),
            Err(e) => warn!(error = %e, "Country cache warm-up failed, continuing with empty cache"),
        }
    }

    /// Looks in the cached list (any age) first, then asks the upstream.
    /// Returns exactly one record.
    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> Result<Country, AppError> {
        if let Some(countries) = self.cache.get_stale(COUNTRIES_CACHE_KEY).await
            && let Some(country) = countries.iter().find(|c| c.matches_name(name))
        {
            info!(name = %name, "Country found in server cache");
            return Ok(country.clone());
        }

        let found = self.upstream.countries_by_name(name).await.map_err(|e| {
            warn!(name = %name, error = %e, "Country name lookup failed");
            AppError::not_found("Country not found")
        })?;

        found
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Country not found"))
    }

    /// Resolves all codes from the cached list when every one is present,
    /// otherwise makes one batched upstream request.
    #[instrument(skip(self), fields(count = codes.len()))]
    pub async fn find_by_codes(&self, codes: &[String]) -> Result<Vec<Country>, AppError> {
        if codes.is_empty() {
            return Err(AppError::not_found("Countries not found"));
        }

        if let Some(countries) = self.cache.get_stale(COUNTRIES_CACHE_KEY).await {
            let local: Vec<Country> = countries
                .iter()
                .filter(|c| c.cca3().is_some_and(|code| codes.iter().any(|x| x == code)))
                .cloned()
                .collect();
            if local.len() == codes.len() {
                return Ok(local);
            }
        }

        self.upstream.countries_by_codes(codes).await.map_err(|e| {
            warn!(error = %e, "Country code lookup failed");
            AppError::not_found("Countries not found")
        })
    }
}

/// Keeps named records and sorts them by common name.
pub fn normalize_countries(raw: Value) -> Result<Vec<Country>, AppError> {
    let Value::Array(items) = raw else {
        return Err(AppError::data_shape("Invalid data format from external API"));
    };

    let mut countries: Vec<Country> = items
        .into_iter()
        .map(Country::from_value)
        .filter(|c| c.common_name().is_some())
        .collect();

    countries.sort_by(|a, b| compare_names(a.common_name(), b.common_name()));
    Ok(countries)
}

/// Accent- and case-insensitive first, so "Åland Islands" sits next to "Albania".
fn compare_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.unwrap_or_default();
    let b = b.unwrap_or_default();
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn collation_key(name: &str) -> String {
    deunicode::deunicode(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use common::cache::TtlCache;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(upstream_url: &str, ttl: Duration) -> CountryService {
        let config = Config::from_source(|key| match key {
            "REST_COUNTRIES_URL" => Some(upstream_url.to_string()),
            "RETRY_ATTEMPTS" => Some("1".to_string()),
            _ => None,
        });
        let upstream = Arc::new(UpstreamClient::new(&config).unwrap());
        CountryService::new(Arc::new(TtlCache::<CountryList>::with_ttl(ttl)), upstream)
    }

    #[test]
    fn test_normalize_filters_unnamed_and_sorts() {
        let raw = json!([
            { "name": { "common": "Turkey" }, "cca3": "TUR" },
            null,
            { "cca3": "XXX" },
            { "name": { "common": "albania" }, "cca3": "ALB" },
            { "name": { "common": "Åland Islands" }, "cca3": "ALA" },
            { "name": { "common": "Germany" }, "cca3": "DEU" },
            { "name": { "common": "Côte d'Ivoire" }, "cca3": "CIV" },
            { "name": { "common": "Costa Rica" }, "cca3": "CRI" },
            { "name": { "common": "Croatia" }, "cca3": "HRV" }
        ]);

        let names: Vec<_> = normalize_countries(raw)
            .unwrap()
            .iter()
            .map(|c| c.common_name().unwrap().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "Åland Islands",
                "albania",
                "Costa Rica",
                "Côte d'Ivoire",
                "Croatia",
                "Germany",
                "Turkey",
            ]
        );
    }

    #[test]
    fn test_accented_names_sort_with_their_base_letter() {
        let raw = json!([
            { "name": { "common": "Cyprus" } },
            { "name": { "common": "Côte d'Ivoire" } },
            { "name": { "common": "Costa Rica" } },
            { "name": { "common": "Croatia" } },
            { "name": { "common": "Albania" } },
            { "name": { "common": "Åland Islands" } },
            { "name": { "common": "Zambia" } },
            { "name": { "common": "Réunion" } },
            { "name": { "common": "Romania" } }
        ]);

        let names: Vec<_> = normalize_countries(raw)
            .unwrap()
            .iter()
            .map(|c| c.common_name().unwrap().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "Åland Islands",
                "Albania",
                "Costa Rica",
                "Côte d'Ivoire",
                "Croatia",
                "Cyprus",
                "Réunion",
                "Romania",
                "Zambia",
            ]
        );
    }

    #[test]
    fn test_normalize_rejects_non_array() {
        let err = normalize_countries(json!({ "message": "rate limited" })).unwrap_err();
        assert!(matches!(err, AppError::DataShapeError(_)));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_upstream_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/all"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "name": { "common": "Turkey" }, "cca3": "TUR" }]))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let service = Arc::new(service(&server.uri(), Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.list().await })
            })
            .collect();

        for handle in handles {
            let (countries, freshness) = handle.await.unwrap().unwrap();
            assert_eq!(countries.len(), 1);
            assert_eq!(freshness, Freshness::Fresh);
        }
    }

    #[tokio::test]
    async fn test_stale_cache_served_when_upstream_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/all"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "name": { "common": "Turkey" }, "cca3": "TUR" }])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/all"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // Zero TTL: every call is a miss, so the second one hits the failing upstream.
        let service = service(&server.uri(), Duration::ZERO);
        let (first, first_freshness) = service.list().await.unwrap();
        let (second, second_freshness) = service.list().await.unwrap();

        assert_eq!(first_freshness, Freshness::Fresh);
        assert_eq!(second_freshness, Freshness::Stale);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stale_cache_served_without_queueing_behind_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/all"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "name": { "common": "Turkey" }, "cca3": "TUR" }])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/all"))
            .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let service = Arc::new(service(&server.uri(), Duration::ZERO));
        service.list().await.unwrap();

        let started = std::time::Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.list().await })
            })
            .collect();

        for handle in handles {
            let (countries, freshness) = handle.await.unwrap().unwrap();
            assert_eq!(countries.len(), 1);
            assert_eq!(freshness, Freshness::Stale);
        }

        // One seed fetch plus a single failing refresh
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_no_cache_and_failing_upstream_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/all"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = service(&server.uri(), Duration::from_secs(60));
        let err = service.list().await.unwrap_err();

        assert!(matches!(err, AppError::UpstreamFailure { .. }));
    }

    #[tokio::test]
    async fn test_find_by_codes_uses_cache_only_when_complete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": { "common": "Armenia" }, "cca3": "ARM" },
                { "name": { "common": "Georgia" }, "cca3": "GEO" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/alpha"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": { "common": "Armenia" }, "cca3": "ARM" },
                { "name": { "common": "Iran" }, "cca3": "IRN" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(&server.uri(), Duration::from_secs(60));
        service.list().await.unwrap();

        let local = service
            .find_by_codes(&["GEO".to_string(), "ARM".to_string()])
            .await
            .unwrap();
        assert_eq!(local.len(), 2);

        let remote = service
            .find_by_codes(&["ARM".to_string(), "IRN".to_string()])
            .await
            .unwrap();
        assert_eq!(remote[1].cca3(), Some("IRN"));
    }
}
