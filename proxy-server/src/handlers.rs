use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use common::errors::AppError;
use common::models::{Country, HealthResponse};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::api_client::UpstreamClient;
use crate::countries::CountryService;

#[derive(Clone)]
pub struct AppState {
    pub countries: Arc<CountryService>,
    pub upstream: Arc<UpstreamClient>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "proxy-server".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/countries",
    responses(
        (status = 200, description = "All countries sorted by common name", body = Vec<Country>),
        (status = 500, description = "Upstream failed and nothing is cached")
    ),
    tag = "countries"
)]
pub async fn list_countries(State(state): State<AppState>) -> Result<Response, AppError> {
    let (countries, freshness) = state.countries.list().await?;

    Ok((
        [(header::CACHE_CONTROL, freshness.cache_control())],
        Json(countries.as_slice()),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/countries/name/{name}",
    params(
        ("name" = String, Path, description = "Common or official country name")
    ),
    responses(
        (status = 200, description = "Array holding the matching country", body = Vec<Country>),
        (status = 404, description = "Country not found")
    ),
    tag = "countries"
)]
pub async fn country_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Country>>, AppError> {
    info!(name = %name, "Country name request received");

    let country = state.countries.find_by_name(&name).await?;

    Ok(Json(vec![country]))
}

#[utoipa::path(
    get,
    path = "/api/countries/codes/{codes}",
    params(
        ("codes" = String, Path, description = "Comma-separated alpha-3 codes")
    ),
    responses(
        (status = 200, description = "Matching countries", body = Vec<Country>),
        (status = 404, description = "Countries not found")
    ),
    tag = "countries"
)]
pub async fn countries_by_codes(
    State(state): State<AppState>,
    Path(codes): Path<String>,
) -> Result<Json<Vec<Country>>, AppError> {
    let codes: Vec<String> = codes
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    info!(count = codes.len(), "Country codes request received");

    let countries = state.countries.find_by_codes(&codes).await?;

    Ok(Json(countries))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Upstream weather JSON, relayed verbatim"),
        (status = 500, description = "Weather data fetch failed")
    ),
    tag = "passthrough"
)]
pub async fn weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<Value>, AppError> {
    const FAILURE: &str = "Weather data fetch failed";

    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(AppError::upstream(FAILURE, "lat and lon are required"));
    };
    info!(lat = %lat, lon = %lon, "Weather request received");

    let body = state.upstream.weather(&lat, &lon).await.map_err(|e| {
        warn!(error = %e, "Weather upstream failed");
        AppError::upstream(FAILURE, e)
    })?;

    Ok(Json(body))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GeocodeQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/geocode",
    params(GeocodeQuery),
    responses(
        (status = 200, description = "Upstream geocoding JSON, relayed verbatim"),
        (status = 400, description = "lat or lng missing"),
        (status = 500, description = "Geocoding failed")
    ),
    tag = "passthrough"
)]
pub async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<GeocodeQuery>,
) -> Result<Json<Value>, AppError> {
    let lat = params.lat.filter(|v| !v.trim().is_empty());
    let lng = params.lng.filter(|v| !v.trim().is_empty());
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(AppError::validation(
            "Latitude and longitude parameters are required",
        ));
    };
    info!(lat = %lat, lng = %lng, "Geocode request received");

    let body = state.upstream.geocode(&lat, &lng).await.map_err(|e| {
        warn!(error = %e, "Geocode upstream failed");
        AppError::UpstreamFailure {
            message: "Geocoding failed".to_string(),
            details: None,
        }
    })?;

    Ok(Json(body))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CurrencyQuery {
    /// Base currency, defaults to USD
    pub from: Option<String>,
    /// Accepted for the client's convenience; conversion happens client-side
    pub to: Option<String>,
    pub amount: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/currency",
    params(CurrencyQuery),
    responses(
        (status = 200, description = "Upstream exchange-rate JSON, relayed verbatim"),
        (status = 500, description = "Currency conversion failed")
    ),
    tag = "passthrough"
)]
pub async fn currency(
    State(state): State<AppState>,
    Query(params): Query<CurrencyQuery>,
) -> Result<Json<Value>, AppError> {
    let from = params
        .from
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "USD".to_string());
    info!(
        from = %from,
        to = params.to.as_deref().unwrap_or("-"),
        amount = params.amount.as_deref().unwrap_or("-"),
        "Currency request received"
    );

    let body = state.upstream.exchange_rates(&from).await.map_err(|e| {
        warn!(error = %e, "Exchange rate upstream failed");
        AppError::UpstreamFailure {
            message: "Currency conversion failed".to_string(),
            details: None,
        }
    })?;

    Ok(Json(body))
}
