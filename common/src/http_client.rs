use crate::errors::AppError;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// HTTP client with a fixed timeout and optional linear-backoff retry.
///
/// Built single-shot; `with_retry` opts a client into retries. Query
/// parameters are appended after the URL is logged, so API keys passed as
/// parameters never reach the logs.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
    backoff: Duration,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_attempts: 1,
            backoff: Duration::ZERO,
            timeout,
        })
    }

    /// Retries up to `max_attempts` total, sleeping `backoff * attempt` between tries.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get_json<T>(&self, url: &str) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.get_json_with_query(url, &[]).await
    }

    /// Fetch JSON from URL, retrying with linear backoff when configured
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_json_with_query<T>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let full_url = Url::parse_with_params(url, query)
            .map_err(|e| AppError::internal(format!("Invalid URL {}: {}", url, e)))?;

        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.fetch_with_timeout(url, full_url.clone()).await {
                Ok(response) => {
                    info!(url = %url, attempt, "Request successful");
                    return Ok(response);
                }
                Err(e) => {
                    if attempt < self.max_attempts {
                        let backoff = self.backoff * attempt;
                        warn!(
                            url = %url,
                            attempt,
                            error = %e,
                            backoff_ms = backoff.as_millis(),
                            "Request failed, retrying with linear backoff"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        if self.max_attempts > 1 {
            error!(
                url = %url,
                attempts = self.max_attempts,
                "All retry attempts exhausted"
            );
        }
        Err(last_error.unwrap_or_else(|| AppError::internal("Unknown error after retries")))
    }

    async fn fetch_with_timeout<T>(&self, url: &str, full_url: Url) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = tokio::time::timeout(self.timeout, self.client.get(full_url).send())
            .await
            .map_err(|_| AppError::timeout(format!("Request to {} timed out", url)))?
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::timeout(format!("Request to {} timed out", url))
                } else {
                    AppError::NetworkError(e.without_url())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(AppError::http(status.as_u16(), message));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::NetworkError(e.without_url()))?;
        let json: T = serde_json::from_str(&text).map_err(AppError::ParseError)?;

        Ok(json)
    }
}
