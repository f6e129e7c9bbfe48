//! # Token Stats SDK
//!
//! Fetches token price, supply, volume and TVL figures from a remote JSON
//! endpoint, caches them briefly, and keeps serving the last good figures when
//! the endpoint misbehaves.
//!
//! ## Usage
//!
//! Construct the pieces explicitly and hold them in your composition root:
//!
//! ```no_run
//! use std::sync::Arc;
//! use token_stats_sdk::{PriceDataSource, PriceQueryController, PriceServiceConfig, QueryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(PriceDataSource::from_config(PriceServiceConfig::from_env()?)?);
//! let controller = PriceQueryController::new(source, QueryPolicy::from_env()?)?;
//!
//! // Poll in the background every refetch interval
//! let _poller = controller.start_polling();
//!
//! // Force a fresh load, bypassing the cache
//! let view = controller.refetch().await;
//! match (view.data, view.error) {
//!     (Some(stats), _) => println!("{} | mcap {} | tvl {}", stats.price, stats.market_cap, stats.tvl),
//!     (None, Some(error)) => eprintln!("unavailable: {}", error),
//!     (None, None) => println!("loading"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! PriceQueryController   polling, retry with backoff, staleness flag
//!     ↓
//! PriceDataSource        TTL cache, stale fallback, single in-flight fetch
//!     ↓
//! PriceFeed              one HTTP GET per call (HttpPriceFeed)
//! ```
//!
//! Two clocks are involved and they are independent: the source serves its
//! cache for `cache_ttl` (60s), while the controller flags data stale after
//! `stale_threshold` (30s) since its last successful cycle.

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod query;
pub mod source;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, PriceServiceConfig, QueryPolicy, RetryPolicy};
pub use error::{ProviderError, QueryError};
pub use format::FormattedStats;
pub use metrics::FetchMetrics;
pub use provider::PriceFeed;
pub use providers::HttpPriceFeed;
pub use query::{PollerHandle, PriceQueryController, QuerySnapshot, QueryState, QueryStatus};
pub use source::PriceDataSource;
pub use types::{ComponentHealth, HealthStatus, PriceEvent, PricePayload, PriceSnapshot};
