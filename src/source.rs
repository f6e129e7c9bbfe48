//! Cached token stats source with stale fallback
//!
//! `PriceDataSource` is the only owner of the cache. Reads inside the TTL are
//! served without touching the network; once the TTL has passed the next call
//! fetches again, and if that fetch fails any cached snapshot (however old) is
//! served instead of the error.
//!
//! Concurrent callers that miss the cache share one network request.

use crate::{
    config::PriceServiceConfig,
    constants::EVENT_CHANNEL_CAPACITY,
    error::ProviderError,
    metrics::{FetchMetrics, MetricsCollector},
    provider::PriceFeed,
    providers::HttpPriceFeed,
    types::{PriceEvent, PriceSnapshot},
};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;

type FetchOutcome = Result<Arc<PriceSnapshot>, ProviderError>;

/// The single network fetch currently in flight, shared by all waiters
type InflightFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Token stats source with a TTL cache and stale-on-error fallback
///
/// # Example
/// ```no_run
/// use token_stats_sdk::{PriceDataSource, PriceServiceConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = PriceDataSource::from_config(PriceServiceConfig::default())?;
/// let snapshot = source.fetch_price_data().await?;
/// println!("price: ${}", snapshot.payload.price_usd);
/// # Ok(())
/// # }
/// ```
pub struct PriceDataSource {
    feed: Arc<dyn PriceFeed>,
    cache: Arc<RwLock<Option<Arc<PriceSnapshot>>>>,
    inflight: Arc<Mutex<Option<InflightFetch>>>,
    cache_ttl: Duration,
    request_timeout: Duration,
    metrics: Arc<MetricsCollector>,
    events: broadcast::Sender<PriceEvent>,
}

impl PriceDataSource {
    /// Creates a source over a custom feed
    ///
    /// Only the cache TTL and request timeout of `config` are used here; the
    /// endpoint settings belong to the feed.
    pub fn new(feed: Arc<dyn PriceFeed>, config: &PriceServiceConfig) -> Result<Self, ProviderError> {
        config
            .validate()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let metrics = Arc::new(MetricsCollector::new(feed.feed_name()));

        Ok(Self {
            feed,
            cache: Arc::new(RwLock::new(None)),
            inflight: Arc::new(Mutex::new(None)),
            cache_ttl: config.cache_ttl,
            request_timeout: config.request_timeout,
            metrics,
            events,
        })
    }

    /// Creates a source backed by the HTTP feed
    pub fn from_config(config: PriceServiceConfig) -> Result<Self, ProviderError> {
        let feed = HttpPriceFeed::new(&config)?;
        Self::new(Arc::new(feed), &config)
    }

    /// Creates a source from `TOKEN_STATS_*` environment variables
    pub fn from_env() -> Result<Self, ProviderError> {
        let config = PriceServiceConfig::from_env()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Self::from_config(config)
    }

    /// Returns the current stats snapshot
    ///
    /// # Returns
    /// * the cached snapshot if it is younger than the TTL (no network call)
    /// * otherwise a freshly fetched snapshot, which replaces the cache
    /// * if the fetch fails, the cached snapshot of any age
    /// * the fetch error only when nothing has ever been cached
    pub async fn fetch_price_data(&self) -> Result<Arc<PriceSnapshot>, ProviderError> {
        self.fetch_if_older_than(self.cache_ttl).await
    }

    /// Like `fetch_price_data`, but only serves a cached snapshot younger
    /// than `max_age` (capped at the TTL)
    ///
    /// Stale fallback on error is unchanged.
    pub async fn fetch_if_older_than(
        &self,
        max_age: Duration,
    ) -> Result<Arc<PriceSnapshot>, ProviderError> {
        if let Some(snapshot) = self.fresh_snapshot(max_age).await {
            tracing::debug!(
                age_ms = snapshot.age().as_millis() as u64,
                "Serving token stats from cache"
            );
            self.metrics.record_cache_hit().await;
            self.emit(PriceEvent::cache_hit(snapshot.age()));
            return Ok(snapshot);
        }

        let error = match self.join_or_start_fetch().await {
            Ok(snapshot) => return Ok(snapshot),
            Err(error) => error,
        };

        let stale = self.cache.read().await.clone();
        match stale {
            Some(snapshot) => {
                tracing::warn!(
                    error = %error,
                    age_ms = snapshot.age().as_millis() as u64,
                    "Token stats fetch failed, serving cached data"
                );
                self.metrics.record_stale_fallback().await;
                self.emit(PriceEvent::stale_fallback(error.to_string(), snapshot.age()));
                Ok(snapshot)
            }
            None => {
                self.emit(PriceEvent::fetch_failed(error.to_string()));
                Err(error)
            }
        }
    }

    /// Empties the cache so the next call goes to the network
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
        tracing::debug!("Token stats cache cleared");
        self.emit(PriceEvent::cache_cleared());
    }

    /// The cached snapshot regardless of age
    pub async fn cached_snapshot(&self) -> Option<Arc<PriceSnapshot>> {
        self.cache.read().await.clone()
    }

    pub async fn has_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// True if the next call would be served without a network request
    pub async fn is_cache_fresh(&self) -> bool {
        self.fresh_snapshot(self.cache_ttl).await.is_some()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn feed_name(&self) -> &'static str {
        self.feed.feed_name()
    }

    /// Subscribes to data-path events
    pub fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
        self.events.subscribe()
    }

    pub async fn metrics(&self) -> FetchMetrics {
        self.metrics.snapshot().await
    }

    /// Publishes an event; having no subscribers is fine
    pub(crate) fn emit(&self, event: PriceEvent) {
        let _ = self.events.send(event);
    }

    async fn fresh_snapshot(&self, max_age: Duration) -> Option<Arc<PriceSnapshot>> {
        let max_age = max_age.min(self.cache_ttl);
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|snapshot| snapshot.is_fresh(max_age))
            .cloned()
    }

    fn join_or_start_fetch(&self) -> InflightFetch {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(fetch) = slot.as_ref() {
            tracing::trace!("Joining in-flight token stats request");
            return fetch.clone();
        }

        let fetch = Self::fetch_and_store(
            self.feed.clone(),
            self.cache.clone(),
            self.inflight.clone(),
            self.metrics.clone(),
            self.events.clone(),
            self.request_timeout,
        )
        .boxed()
        .shared();
        *slot = Some(fetch.clone());
        fetch
    }

    /// Performs one bounded network fetch and stores the result
    async fn fetch_and_store(
        feed: Arc<dyn PriceFeed>,
        cache: Arc<RwLock<Option<Arc<PriceSnapshot>>>>,
        inflight: Arc<Mutex<Option<InflightFetch>>>,
        metrics: Arc<MetricsCollector>,
        events: broadcast::Sender<PriceEvent>,
        request_timeout: Duration,
    ) -> FetchOutcome {
        let start = Instant::now();
        let result = match tokio::time::timeout(request_timeout, feed.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };
        let latency = start.elapsed();
        metrics.record_request(latency, result.is_ok()).await;

        let outcome = match result {
            Ok(payload) => {
                let snapshot = Arc::new(PriceSnapshot::new(payload));
                *cache.write().await = Some(snapshot.clone());
                tracing::debug!(
                    feed = feed.feed_name(),
                    price_usd = snapshot.payload.price_usd,
                    latency_ms = latency.as_millis() as u64,
                    "Successfully fetched token stats"
                );
                let _ = events.send(PriceEvent::fetch_succeeded(
                    snapshot.payload.price_usd,
                    latency,
                ));
                Ok(snapshot)
            }
            Err(error) => {
                tracing::warn!(
                    feed = feed.feed_name(),
                    error = %error,
                    latency_ms = latency.as_millis() as u64,
                    "Token stats request failed"
                );
                Err(error)
            }
        };

        *inflight.lock().unwrap_or_else(PoisonError::into_inner) = None;
        outcome
    }
}
