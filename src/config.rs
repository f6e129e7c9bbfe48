//! Runtime configuration for the data source and the query controller
//!
//! Both structs default to the values in `constants` and can be overlaid from
//! `TOKEN_STATS_*` environment variables. Validation happens when a feed,
//! source or controller is constructed.

use crate::constants::{
    CACHE_TTL_MS, DEFAULT_PRICE_API_URL, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RETRY_ATTEMPTS,
    REFETCH_INTERVAL_MS, REQUEST_TIMEOUT_MS, STALE_THRESHOLD_MS,
};
use reqwest::header::HeaderValue;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const ENV_API_URL: &str = "TOKEN_STATS_API_URL";
pub const ENV_API_KEY: &str = "TOKEN_STATS_API_KEY";
pub const ENV_CACHE_TTL_MS: &str = "TOKEN_STATS_CACHE_TTL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TOKEN_STATS_REQUEST_TIMEOUT_MS";
pub const ENV_REFETCH_INTERVAL_MS: &str = "TOKEN_STATS_REFETCH_INTERVAL_MS";
pub const ENV_STALE_THRESHOLD_MS: &str = "TOKEN_STATS_STALE_THRESHOLD_MS";
pub const ENV_MAX_RETRIES: &str = "TOKEN_STATS_MAX_RETRIES";
pub const ENV_MAX_BACKOFF_MS: &str = "TOKEN_STATS_MAX_BACKOFF_MS";

/// Errors raised while building or validating configuration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Endpoint URL is empty or cannot be parsed
    #[error("Invalid endpoint URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A duration that must be positive is zero
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    /// An environment variable holds a value that does not parse
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    /// API key cannot be sent as a header value
    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,
}

/// Settings for `PriceDataSource` and the HTTP feed behind it
#[derive(Debug, Clone, PartialEq)]
pub struct PriceServiceConfig {
    /// Pricing endpoint queried with GET
    pub endpoint: String,
    /// Optional key sent in the `X-API-Key` header
    pub api_key: Option<String>,
    /// How long a snapshot is served from cache without a network call
    pub cache_ttl: Duration,
    /// Upper bound on a single network fetch
    pub request_timeout: Duration,
}

impl Default for PriceServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PRICE_API_URL.to_string(),
            api_key: None,
            cache_ttl: Duration::from_millis(CACHE_TTL_MS),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }
}

impl PriceServiceConfig {
    /// Defaults overlaid with `TOKEN_STATS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.endpoint = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            let key = key.trim().to_string();
            self.api_key = (!key.is_empty()).then_some(key);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_CACHE_TTL_MS)? {
            self.cache_ttl = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_REQUEST_TIMEOUT_MS)? {
            self.request_timeout = Duration::from_millis(ms);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Checks the endpoint, durations and API key
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidUrl {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.endpoint.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "cache_ttl" });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "request_timeout",
            });
        }
        if let Some(key) = &self.api_key {
            HeaderValue::from_str(key).map_err(|_| ConfigError::InvalidApiKey)?;
        }
        Ok(())
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRY_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (0-indexed): `min(initial * 2^attempt, max)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Total number of fetch attempts in one cycle
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Polling, staleness and retry settings for `PriceQueryController`
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPolicy {
    pub refetch_interval: Duration,
    /// Age after which successfully loaded data is flagged stale
    pub stale_threshold: Duration,
    pub retry: RetryPolicy,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            refetch_interval: Duration::from_millis(REFETCH_INTERVAL_MS),
            stale_threshold: Duration::from_millis(STALE_THRESHOLD_MS),
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryPolicy {
    /// Defaults overlaid with `TOKEN_STATS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_u64(&lookup, ENV_REFETCH_INTERVAL_MS)? {
            self.refetch_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_STALE_THRESHOLD_MS)? {
            self.stale_threshold = Duration::from_millis(ms);
        }
        if let Some(n) = parse_u64(&lookup, ENV_MAX_RETRIES)? {
            self.retry.max_retries = u32::try_from(n).map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_RETRIES,
                value: n.to_string(),
            })?;
        }
        if let Some(ms) = parse_u64(&lookup, ENV_MAX_BACKOFF_MS)? {
            self.retry.max_backoff = Duration::from_millis(ms);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }

    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refetch_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "refetch_interval",
            });
        }
        if self.retry.initial_backoff.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "initial_backoff",
            });
        }
        if self.retry.max_backoff < self.retry.initial_backoff {
            return Err(ConfigError::InvalidValue {
                key: ENV_MAX_BACKOFF_MS,
                value: self.retry.max_backoff.as_millis().to_string(),
            });
        }
        Ok(())
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
