use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Country record as returned by the REST Countries API.
///
/// The upstream object is kept verbatim so it can be relayed and persisted
/// without losing fields; accessors read the parts this system consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct Country(Value);

impl Country {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.0.pointer(pointer).and_then(Value::as_str)
    }

    fn str_list_at(&self, pointer: &str) -> Vec<&str> {
        self.0
            .pointer(pointer)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    fn latlng_at(&self, pointer: &str) -> Option<(f64, f64)> {
        let pair = self.0.pointer(pointer)?.as_array()?;
        Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
    }

    pub fn common_name(&self) -> Option<&str> {
        self.str_at("/name/common")
    }

    pub fn official_name(&self) -> Option<&str> {
        self.str_at("/name/official")
    }

    /// ISO 3166-1 alpha-3 code, the identity used by `borders`.
    pub fn cca3(&self) -> Option<&str> {
        self.str_at("/cca3")
    }

    pub fn capital(&self) -> Option<&str> {
        self.str_at("/capital/0")
    }

    pub fn capital_latlng(&self) -> Option<(f64, f64)> {
        self.latlng_at("/capitalInfo/latlng")
    }

    pub fn latlng(&self) -> Option<(f64, f64)> {
        self.latlng_at("/latlng")
    }

    pub fn population(&self) -> Option<u64> {
        self.0.get("population").and_then(Value::as_u64)
    }

    pub fn area(&self) -> Option<f64> {
        self.0.get("area").and_then(Value::as_f64)
    }

    pub fn region(&self) -> Option<&str> {
        self.str_at("/region")
    }

    pub fn currency_codes(&self) -> Vec<&str> {
        self.0
            .get("currencies")
            .and_then(Value::as_object)
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn currency_name(&self, code: &str) -> Option<&str> {
        self.0.get("currencies")?.get(code)?.get("name")?.as_str()
    }

    pub fn languages(&self) -> Vec<&str> {
        self.0
            .get("languages")
            .and_then(Value::as_object)
            .map(|map| map.values().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn flag_png(&self) -> Option<&str> {
        self.str_at("/flags/png")
    }

    pub fn borders(&self) -> Vec<&str> {
        self.str_list_at("/borders")
    }

    pub fn timezones(&self) -> Vec<&str> {
        self.str_list_at("/timezones")
    }

    pub fn top_level_domains(&self) -> Vec<&str> {
        self.str_list_at("/tld")
    }

    pub fn driving_side(&self) -> Option<&str> {
        self.str_at("/car/side")
    }

    /// International calling code, `idd.root` joined with the first suffix.
    pub fn calling_code(&self) -> Option<String> {
        let root = self.str_at("/idd/root")?;
        let suffix = self.str_at("/idd/suffixes/0").unwrap_or_default();
        Some(format!("{}{}", root, suffix))
    }

    /// Case-insensitive match against the common or official name.
    pub fn matches_name(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        [self.common_name(), self.official_name()]
            .into_iter()
            .flatten()
            .any(|candidate| candidate.to_lowercase() == needle)
    }
}

/// Service health response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
