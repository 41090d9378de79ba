pub mod api_client;
pub mod config;
pub mod countries;
pub mod handlers;
pub mod openapi;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use common::cache::TtlCache;
use common::errors::AppError;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api_client::UpstreamClient;
use crate::config::Config;
use crate::countries::{CountryList, CountryService};
use crate::handlers::AppState;

/// Wires the upstream client and the in-memory country cache from config.
pub fn build_state(config: &Config) -> Result<AppState, AppError> {
    let upstream = Arc::new(UpstreamClient::new(config)?);
    let cache = Arc::new(TtlCache::<CountryList>::with_ttl(config.countries_cache_ttl));
    let countries = Arc::new(CountryService::new(cache, upstream.clone()));

    Ok(AppState {
        countries,
        upstream,
    })
}

pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/countries", get(handlers::list_countries))
        .route("/api/countries/name/{name}", get(handlers::country_by_name))
        .route(
            "/api/countries/codes/{codes}",
            get(handlers::countries_by_codes),
        )
        .route("/api/weather", get(handlers::weather))
        .route("/api/geocode", get(handlers::geocode))
        .route("/api/currency", get(handlers::currency))
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// GET-only CORS restricted to the configured origins; `*` opens it up without credentials.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods([Method::GET]);

    if allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
