//! HTTP token stats feed

use crate::{
    config::PriceServiceConfig,
    constants::{API_KEY_HEADER, SUCCESS_ERROR_CODE, USER_AGENT},
    error::ProviderError,
    provider::PriceFeed,
    types::PricePayload,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

/// Response envelope: a status block plus the stats object
#[derive(Debug, Deserialize)]
struct StatsResponse {
    status: ResponseStatus,
    #[serde(default)]
    data: Option<PricePayload>,
}

#[derive(Debug, Deserialize)]
struct ResponseStatus {
    error_code: Option<i64>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Feed that GETs the configured pricing endpoint
pub struct HttpPriceFeed {
    client: Client,
    endpoint: Url,
}

impl HttpPriceFeed {
    /// Creates a new HTTP feed
    ///
    /// Fails with `ProviderError::Configuration` when the endpoint, API key
    /// or timeouts are invalid.
    pub fn new(config: &PriceServiceConfig) -> Result<Self, ProviderError> {
        config
            .validate()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| ProviderError::Configuration(e.to_string()))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// Validates the envelope and extracts the payload
    fn parse_response(response_text: &str) -> Result<PricePayload, ProviderError> {
        let response: StatsResponse = serde_json::from_str(response_text).map_err(|e| {
            ProviderError::invalid(format!(
                "Failed to parse stats response: {}. Response: {}",
                e, response_text
            ))
        })?;

        match response.status.error_code {
            Some(SUCCESS_ERROR_CODE) => {}
            Some(code) => {
                return Err(ProviderError::invalid(format!(
                    "API reported error {}: {}",
                    code,
                    response
                        .status
                        .error_message
                        .unwrap_or_else(|| "no message".to_string())
                )))
            }
            None => return Err(ProviderError::invalid("Missing status.error_code")),
        }

        response
            .data
            .ok_or_else(|| ProviderError::invalid("Successful response without data"))
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn fetch(&self) -> Result<PricePayload, ProviderError> {
        tracing::debug!(endpoint = %self.endpoint, "Fetching token stats");

        let response = self.client.get(self.endpoint.clone()).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::remote(status));
        }

        let response_text = response.text().await?;
        let payload = Self::parse_response(&response_text)?;

        tracing::debug!(price_usd = payload.price_usd, "Fetched token stats");

        Ok(payload)
    }

    fn feed_name(&self) -> &'static str {
        "http"
    }
}
