//! Types for the token stats service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Token pricing, supply, volume and TVL figures from one response
///
/// The endpoint sends these as numeric strings; they are parsed to `f64` on
/// decode so an unparseable figure rejects the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePayload {
    /// Price in USD
    #[serde(deserialize_with = "de_f64")]
    pub price_usd: f64,

    /// Price in ETH
    #[serde(deserialize_with = "de_f64")]
    pub price_eth: f64,

    #[serde(deserialize_with = "de_f64")]
    pub market_cap: f64,

    #[serde(deserialize_with = "de_f64")]
    pub circulating_supply: f64,

    #[serde(deserialize_with = "de_f64")]
    pub total_supply: f64,

    /// 24h trading volume in USD
    #[serde(deserialize_with = "de_f64")]
    pub volume_24h: f64,

    /// Total value locked in USD
    #[serde(deserialize_with = "de_f64")]
    pub tvl: f64,

    /// 24h price change percentage
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub price_change_24h: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("expected a numeric string, got {:?}", s))),
        }
    }
}

fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.into_f64()
}

fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(|value| value.into_f64())
        .transpose()
}

/// One successful fetch
///
/// Never mutated after construction; the data source shares it as
/// `Arc<PriceSnapshot>` and replaces it wholesale on the next fetch.
#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    /// Fetched payload
    pub payload: PricePayload,

    /// Wall-clock time of the fetch
    pub fetched_at: DateTime<Utc>,

    /// Monotonic capture time, used for TTL checks
    captured: Instant,
}

impl PriceSnapshot {
    /// Captures a payload at the current instant
    pub fn new(payload: PricePayload) -> Self {
        Self {
            payload,
            fetched_at: Utc::now(),
            captured: Instant::now(),
        }
    }

    /// Epoch timestamp of the fetch in milliseconds
    pub fn fetched_at_millis(&self) -> i64 {
        self.fetched_at.timestamp_millis()
    }

    /// Time elapsed since the fetch
    pub fn age(&self) -> Duration {
        self.captured.elapsed()
    }

    /// True while the snapshot is younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Events published by the data source and the query controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceEvent {
    /// Served from a fresh cache entry without a network call
    CacheHit {
        id: Uuid,
        age_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Network fetch produced a new snapshot
    FetchSucceeded {
        id: Uuid,
        price_usd: f64,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Network fetch failed and nothing was cached
    FetchFailed {
        id: Uuid,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// Network fetch failed and a cached snapshot was served instead
    StaleFallback {
        id: Uuid,
        error_message: String,
        age_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Cache was emptied explicitly
    CacheCleared { id: Uuid, timestamp: DateTime<Utc> },

    /// Controller will retry after a delay
    RetryScheduled {
        id: Uuid,
        attempt: u32,
        delay_ms: u64,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// Controller gave up on the current cycle
    RetriesExhausted {
        id: Uuid,
        attempts: u32,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

impl PriceEvent {
    pub fn cache_hit(age: Duration) -> Self {
        Self::CacheHit {
            id: Uuid::new_v4(),
            age_ms: duration_ms(age),
            timestamp: Utc::now(),
        }
    }

    pub fn fetch_succeeded(price_usd: f64, latency: Duration) -> Self {
        Self::FetchSucceeded {
            id: Uuid::new_v4(),
            price_usd,
            latency_ms: duration_ms(latency),
            timestamp: Utc::now(),
        }
    }

    pub fn fetch_failed(error_message: impl Into<String>) -> Self {
        Self::FetchFailed {
            id: Uuid::new_v4(),
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn stale_fallback(error_message: impl Into<String>, age: Duration) -> Self {
        Self::StaleFallback {
            id: Uuid::new_v4(),
            error_message: error_message.into(),
            age_ms: duration_ms(age),
            timestamp: Utc::now(),
        }
    }

    pub fn cache_cleared() -> Self {
        Self::CacheCleared {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    pub fn retry_scheduled(attempt: u32, delay: Duration, error_message: impl Into<String>) -> Self {
        Self::RetryScheduled {
            id: Uuid::new_v4(),
            attempt,
            delay_ms: duration_ms(delay),
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn retries_exhausted(attempts: u32, error_message: impl Into<String>) -> Self {
        Self::RetriesExhausted {
            id: Uuid::new_v4(),
            attempts,
            error_message: error_message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            PriceEvent::CacheHit { id, .. }
            | PriceEvent::FetchSucceeded { id, .. }
            | PriceEvent::FetchFailed { id, .. }
            | PriceEvent::StaleFallback { id, .. }
            | PriceEvent::CacheCleared { id, .. }
            | PriceEvent::RetryScheduled { id, .. }
            | PriceEvent::RetriesExhausted { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            PriceEvent::CacheHit { .. } => "CACHE_HIT",
            PriceEvent::FetchSucceeded { .. } => "FETCH_SUCCEEDED",
            PriceEvent::FetchFailed { .. } => "FETCH_FAILED",
            PriceEvent::StaleFallback { .. } => "STALE_FALLBACK",
            PriceEvent::CacheCleared { .. } => "CACHE_CLEARED",
            PriceEvent::RetryScheduled { .. } => "RETRY_SCHEDULED",
            PriceEvent::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
        }
    }
}

impl std::fmt::Display for PriceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceEvent::CacheHit { age_ms, .. } => write!(f, "Cache hit (age: {}ms)", age_ms),
            PriceEvent::FetchSucceeded {
                price_usd,
                latency_ms,
                ..
            } => write!(f, "Fetched price ${} in {}ms", price_usd, latency_ms),
            PriceEvent::FetchFailed { error_message, .. } => {
                write!(f, "Fetch failed: {}", error_message)
            }
            PriceEvent::StaleFallback {
                error_message,
                age_ms,
                ..
            } => write!(
                f,
                "Serving cached data (age: {}ms) after error: {}",
                age_ms, error_message
            ),
            PriceEvent::CacheCleared { .. } => write!(f, "Cache cleared"),
            PriceEvent::RetryScheduled {
                attempt, delay_ms, ..
            } => write!(f, "Retry {} scheduled in {}ms", attempt + 1, delay_ms),
            PriceEvent::RetriesExhausted {
                attempts,
                error_message,
                ..
            } => write!(
                f,
                "Gave up after {} attempts: {}",
                attempts, error_message
            ),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Fresh data is available
    Healthy,
    /// Data is available but stale, or the last refresh failed
    Degraded,
    /// No data is available
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
