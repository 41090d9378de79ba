use common::errors::AppError;
use common::http_client::HttpClient;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::instrument;

use crate::config::ClientConfig;

/// Exchange rates relative to `base`
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRates {
    #[serde(default)]
    pub base: Option<String>,
    pub rates: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub result: f64,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {:.2} {}",
            self.amount, self.from, self.result, self.to
        )
    }
}

/// Amount must be present, finite and positive
pub fn validate_amount(amount: Option<f64>) -> Result<f64, AppError> {
    match amount {
        Some(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(AppError::validation("Please enter a valid amount")),
    }
}

pub fn convert_with(
    rates: &ExchangeRates,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<Conversion, AppError> {
    let rate = rates
        .rates
        .get(to)
        .ok_or_else(|| AppError::data_shape(format!("No exchange rate for {}", to)))?;

    Ok(Conversion {
        amount,
        from: from.to_string(),
        to: to.to_string(),
        result: amount * rate,
    })
}

pub struct CurrencyClient {
    config: ClientConfig,
    http: HttpClient,
}

impl CurrencyClient {
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let http = HttpClient::new(config.timeout)?;
        Ok(Self { config, http })
    }

    #[instrument(skip(self))]
    pub async fn currency_rates(&self, from: &str) -> Result<ExchangeRates, AppError> {
        self.http
            .get_json_with_query(&self.config.proxy("/api/currency"), &[("from", from)])
            .await
    }

    /// Validates the amount before any request is made
    #[instrument(skip(self))]
    pub async fn convert(
        &self,
        amount: Option<f64>,
        from: &str,
        to: &str,
    ) -> Result<Conversion, AppError> {
        let amount = validate_amount(amount)?;
        let (from, to) = (from.trim().to_uppercase(), to.trim().to_uppercase());
        if from.is_empty() || to.is_empty() {
            return Err(AppError::validation("Please select both currencies"));
        }

        let rates = self.currency_rates(&from).await?;
        convert_with(&rates, amount, &from, &to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn usd_rates() -> ExchangeRates {
        serde_json::from_value(json!({
            "base": "USD",
            "rates": { "USD": 1.0, "TRY": 32.5, "EUR": 0.92 }
        }))
        .unwrap()
    }

    #[test]
    fn test_convert_multiplies_by_target_rate() {
        let conversion = convert_with(&usd_rates(), 10.0, "USD", "TRY").unwrap();

        assert_eq!(conversion.result, 325.0);
        assert_eq!(conversion.to_string(), "10 USD = 325.00 TRY");
    }

    #[test]
    fn test_missing_target_rate_is_data_shape_error() {
        let result = convert_with(&usd_rates(), 1.0, "USD", "XYZ");

        assert!(matches!(result, Err(AppError::DataShapeError(_))));
    }

    #[test]
    fn test_amount_validation() {
        assert_eq!(validate_amount(Some(2.5)).unwrap(), 2.5);
        assert!(validate_amount(None).is_err());
        assert!(validate_amount(Some(0.0)).is_err());
        assert!(validate_amount(Some(-4.0)).is_err());
        assert!(validate_amount(Some(f64::NAN)).is_err());
    }

    #[tokio::test]
    async fn test_convert_fetches_rates_for_source_currency() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/currency"))
            .and(query_param("from", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "base": "EUR",
                "rates": { "EUR": 1.0, "USD": 1.08 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CurrencyClient::new(ClientConfig::with_base(&mock_server.uri())).unwrap();
        let conversion = client.convert(Some(100.0), "eur", "usd").await.unwrap();

        assert_eq!(conversion.from, "EUR");
        assert_eq!(conversion.to_string(), "100 EUR = 108.00 USD");
    }

    #[tokio::test]
    async fn test_invalid_amount_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = CurrencyClient::new(ClientConfig::with_base(&mock_server.uri())).unwrap();
        let result = client.convert(None, "USD", "TRY").await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
