// JSON-over-HTTP candle source: GET {base_url}/candles?symbol=&timeframe=&from=&to=

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::CandleSource;
use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::RawCandle;

/// Longest response body excerpt carried into error messages.
const ERROR_BODY_EXCERPT: usize = 200;

pub struct HttpCandleSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCandleSource {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

/// Client-error responses fail identically on retry, except timeouts and rate limiting.
pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    !status.is_client_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl CandleSource for HttpCandleSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<RawCandle>, FetchError> {
        let url = format!("{}/candles", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("symbol", symbol.to_string()),
            ("timeframe", timeframe.to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
        ]);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transient(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            let message = format!("HTTP {}: {}", status.as_u16(), excerpt.trim());
            return Err(if is_retryable_status(status) {
                FetchError::transient(message)
            } else {
                FetchError::non_retryable(message)
            });
        }

        response
            .json::<Vec<RawCandle>>()
            .await
            .map_err(|e| FetchError::transient(format!("invalid candle payload: {}", e)))
    }
}
