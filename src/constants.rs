//! Constants for the token stats service
//!
//! Literal defaults for every configurable knob. `PriceServiceConfig` and
//! `QueryPolicy` start from these values and may be overridden from the
//! environment.

/// Default pricing endpoint
pub const DEFAULT_PRICE_API_URL: &str = "https://api.roko.network/v1/token/stats";

/// How long a cached snapshot is served without a network call (in milliseconds)
pub const CACHE_TTL_MS: u64 = 60_000;

/// How often the query controller refreshes in the background (in milliseconds)
pub const REFETCH_INTERVAL_MS: u64 = 60_000;

/// How long returned data counts as fresh for display purposes (in milliseconds)
pub const STALE_THRESHOLD_MS: u64 = 30_000;

/// HTTP request timeout when fetching stats (in milliseconds)
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Maximum number of retries after the initial attempt
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff delay for retries (in milliseconds)
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay for retries (in milliseconds)
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Value of `status.error_code` on a successful response
pub const SUCCESS_ERROR_CODE: i64 = 0;

/// Header carrying the optional API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "token-stats-sdk/0.1.0";
