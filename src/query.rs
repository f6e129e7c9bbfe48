//! Polling query controller over a `PriceDataSource`
//!
//! Presents token stats to UI-facing callers as a small state machine:
//!
//! ```text
//! Idle ──start──▶ Loading ──ok──▶ Success ──interval──▶ Loading
//!                  │  ▲                                   │
//!                  │  └──fail, retries left (backoff)─────┘
//!                  └──fail, retries exhausted──▶ Error ──refetch/interval──▶ Loading
//! ```
//!
//! The last good payload stays visible through `Loading` and `Error`.
//! Failures never escape the public operations; they are recorded as the
//! error message in the observed state.

use crate::{
    config::{ConfigError, QueryPolicy},
    error::QueryError,
    format::FormattedStats,
    source::PriceDataSource,
    types::{ComponentHealth, HealthStatus, PriceEvent, PricePayload, PriceSnapshot},
};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant, MissedTickBehavior};

/// Lifecycle of the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Nothing requested yet
    Idle,
    /// A fetch cycle is running
    Loading,
    /// The last cycle produced data
    Success,
    /// The last cycle failed and gave up
    Error,
}

/// Internal controller state, observable through `subscribe`
#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: QueryStatus,
    /// Last known good snapshot, kept across failures
    pub snapshot: Option<Arc<PriceSnapshot>>,
    pub error: Option<String>,
    /// Failed attempts in the running cycle
    pub failure_count: u32,
    /// Controller-side time of the last successful cycle
    pub last_success: Option<Instant>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl QueryState {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            snapshot: None,
            error: None,
            failure_count: 0,
            last_success: None,
            last_success_at: None,
        }
    }
}

/// What consumers render: formatted data, raw data, loading and error flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<FormattedStats>,
    pub raw_data: Option<PricePayload>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Data is older than the stale threshold on the controller's clock
    pub is_stale: bool,
    pub last_success_at: Option<DateTime<Utc>>,
}

type CycleFuture = Shared<BoxFuture<'static, QuerySnapshot>>;

struct Inner {
    source: Arc<PriceDataSource>,
    policy: QueryPolicy,
    state: watch::Sender<QueryState>,
    cycle: Mutex<Option<CycleFuture>>,
}

/// Polling query with retry-with-backoff and a staleness flag
///
/// Cloning is cheap; clones share the same state and in-flight cycle.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use token_stats_sdk::{PriceDataSource, PriceQueryController, PriceServiceConfig, QueryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = Arc::new(PriceDataSource::from_config(PriceServiceConfig::default())?);
/// let controller = PriceQueryController::new(source, QueryPolicy::default())?;
/// let _poller = controller.start_polling();
///
/// let view = controller.get_snapshot();
/// if let Some(stats) = view.data {
///     println!("{} (market cap {})", stats.price, stats.market_cap);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PriceQueryController {
    inner: Arc<Inner>,
}

impl PriceQueryController {
    pub fn new(source: Arc<PriceDataSource>, policy: QueryPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        let (state, _) = watch::channel(QueryState::idle());
        Ok(Self {
            inner: Arc::new(Inner {
                source,
                policy,
                state,
                cycle: Mutex::new(None),
            }),
        })
    }

    /// Reads the current state without waiting on any fetch
    pub fn get_snapshot(&self) -> QuerySnapshot {
        self.inner.view()
    }

    /// Subscribes to state transitions
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.inner.state.subscribe()
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.inner.policy
    }

    pub fn source(&self) -> &Arc<PriceDataSource> {
        &self.inner.source
    }

    /// Runs a fetch cycle, or joins the one already running
    ///
    /// Fresh cached data is used when available.
    pub async fn fetch(&self) -> QuerySnapshot {
        self.join_or_start_cycle(self.inner.source.cache_ttl()).await
    }

    /// Drops the source cache and runs a fetch cycle
    ///
    /// A new cycle starts with a zero retry count. If a cycle is already
    /// running, the caller joins it and receives its outcome; no second
    /// network request is made.
    pub async fn refetch(&self) -> QuerySnapshot {
        self.inner.source.clear_cache().await;
        self.join_or_start_cycle(self.inner.source.cache_ttl()).await
    }

    /// Starts background polling
    ///
    /// The first cycle runs immediately, then one every `refetch_interval`.
    /// A tick only serves cached data that was fetched after the previous
    /// tick's cycle finished, so each interval reaches the network even when
    /// it equals the cache TTL. Polling stops when the returned handle is
    /// stopped or dropped.
    pub fn start_polling(&self) -> PollerHandle {
        let controller = self.clone();
        let interval = self.inner.policy.refetch_interval;

        let handle = tokio::spawn(async move {
            tracing::info!(
                refetch_interval_ms = interval.as_millis() as u64,
                "Starting token stats poller"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut max_age = interval;
            loop {
                let tick = ticker.tick().await;
                controller.join_or_start_cycle(max_age).await;
                max_age = interval.saturating_sub(tick.elapsed());
            }
        });

        PollerHandle { handle }
    }

    /// Perform a health check on the query
    pub fn health_check(&self) -> ComponentHealth {
        let view = self.get_snapshot();
        let mut details = HashMap::new();
        details.insert("status".to_string(), serde_json::json!(view.status));
        details.insert("is_stale".to_string(), serde_json::json!(view.is_stale));
        details.insert(
            "feed_name".to_string(),
            serde_json::json!(self.inner.source.feed_name()),
        );
        if let Some(at) = view.last_success_at {
            details.insert(
                "last_success_at".to_string(),
                serde_json::json!(at.to_rfc3339()),
            );
        }

        let (status, message) = match (&view.raw_data, &view.error) {
            (None, _) => (
                HealthStatus::Unhealthy,
                "Token stats query has no data".to_string(),
            ),
            (Some(_), Some(error)) => (
                HealthStatus::Degraded,
                format!("Token stats query is serving old data: {}", error),
            ),
            (Some(_), None) if view.is_stale => (
                HealthStatus::Degraded,
                "Token stats query data is stale".to_string(),
            ),
            (Some(_), None) => (
                HealthStatus::Healthy,
                "Token stats query is operational with fresh data".to_string(),
            ),
        };

        ComponentHealth {
            name: "token_stats_query".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: Utc::now(),
        }
    }

    /// Joins the running cycle, or starts one that serves cached data
    /// younger than `max_age`
    fn join_or_start_cycle(&self, max_age: Duration) -> CycleFuture {
        let mut slot = self
            .inner
            .cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cycle) = slot.as_ref() {
            return cycle.clone();
        }

        // The cycle runs as its own task so it completes even if every
        // caller stops waiting on it.
        let task = tokio::spawn(Inner::run_cycle(self.inner.clone(), max_age));
        let inner = self.inner.clone();
        let cycle = async move {
            match task.await {
                Ok(view) => view,
                Err(e) => {
                    tracing::error!(error = %e, "Token stats fetch cycle aborted");
                    inner.clear_cycle();
                    inner.view()
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(cycle.clone());
        cycle
    }
}

impl Inner {
    fn view(&self) -> QuerySnapshot {
        let state = self.state.borrow();
        let is_stale = state
            .last_success
            .is_some_and(|at| at.elapsed() > self.policy.stale_threshold);

        QuerySnapshot {
            status: state.status,
            data: state
                .snapshot
                .as_ref()
                .map(|s| FormattedStats::from_payload(&s.payload)),
            raw_data: state.snapshot.as_ref().map(|s| s.payload.clone()),
            is_loading: state.status == QueryStatus::Loading,
            error: state.error.clone(),
            is_stale,
            last_success_at: state.last_success_at,
        }
    }

    fn clear_cycle(&self) {
        *self.cycle.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// One fetch cycle: an initial attempt plus up to `max_retries` retries
    async fn run_cycle(self: Arc<Self>, max_age: Duration) -> QuerySnapshot {
        let retry = self.policy.retry;
        self.state.send_modify(|state| {
            state.status = QueryStatus::Loading;
            state.failure_count = 0;
        });

        let mut attempt: u32 = 0;
        loop {
            let error = match self.source.fetch_if_older_than(max_age).await {
                Ok(snapshot) => {
                    self.state.send_modify(|state| {
                        state.status = QueryStatus::Success;
                        state.snapshot = Some(snapshot);
                        state.error = None;
                        state.failure_count = 0;
                        state.last_success = Some(Instant::now());
                        state.last_success_at = Some(Utc::now());
                    });
                    break;
                }
                Err(error) => error,
            };

            self.state.send_modify(|state| state.failure_count = attempt + 1);

            if !error.is_retryable() {
                tracing::error!(error = %error, "Token stats fetch failed, not retrying");
                self.settle_error(QueryError::NotRetryable(error));
                break;
            }

            if attempt >= retry.max_retries {
                let failure = QueryError::ExhaustedRetries {
                    attempts: attempt + 1,
                    last_error: error,
                };
                tracing::error!(error = %failure, "Token stats fetch gave up");
                self.source
                    .emit(PriceEvent::retries_exhausted(attempt + 1, failure.to_string()));
                self.settle_error(failure);
                break;
            }

            let delay = retry.backoff_delay(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = retry.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Token stats fetch failed, retrying"
            );
            self.source
                .emit(PriceEvent::retry_scheduled(attempt, delay, error.to_string()));
            sleep(delay).await;
            attempt += 1;
        }

        self.clear_cycle();
        self.view()
    }

    fn settle_error(&self, error: QueryError) {
        self.state.send_modify(|state| {
            state.status = QueryStatus::Error;
            state.error = Some(error.to_string());
        });
    }
}

/// Handle to a running poller
///
/// Dropping the handle stops polling. A cycle already in progress still
/// finishes and updates the cache and state.
pub struct PollerHandle {
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.handle.abort();
        tracing::info!("Stopped token stats poller");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PriceServiceConfig, RetryPolicy};
    use crate::error::ProviderError;
    use crate::provider::mock::MockFeed;
    use crate::test_support::sample_payload;

    fn controller_with(feed: &MockFeed) -> PriceQueryController {
        let source =
            PriceDataSource::new(Arc::new(feed.clone()), &PriceServiceConfig::default()).unwrap();
        PriceQueryController::new(Arc::new(source), QueryPolicy::default()).unwrap()
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let controller = controller_with(&MockFeed::new());
        let view = controller.get_snapshot();

        assert_eq!(view.status, QueryStatus::Idle);
        assert!(view.data.is_none());
        assert!(view.raw_data.is_none());
        assert!(!view.is_loading);
        assert!(view.error.is_none());
        assert!(!view.is_stale);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.123456));
        let controller = controller_with(&feed);

        let view = controller.fetch().await;

        assert_eq!(view.status, QueryStatus::Success);
        assert_eq!(view.data.unwrap().price, "0.123456");
        assert_eq!(view.raw_data.unwrap().price_usd, 0.123456);
        assert!(!view.is_loading);
        assert!(view.error.is_none());
        assert!(view.last_success_at.is_some());
        assert_eq!(controller.get_snapshot().status, QueryStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_backoff_then_succeeds() {
        let feed = MockFeed::new();
        feed.push(Err(ProviderError::Timeout));
        feed.push(Err(ProviderError::Network("reset".to_string())));
        feed.set_payload(sample_payload(0.5));
        let controller = controller_with(&feed);
        let mut events = controller.source().subscribe();

        let start = Instant::now();
        let view = controller.fetch().await;
        let elapsed = start.elapsed();

        assert_eq!(view.status, QueryStatus::Success);
        assert_eq!(feed.call_count(), 3);
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(3100));

        let mut delays = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let PriceEvent::RetryScheduled { delay_ms, .. } = event {
                delays.push(delay_ms);
            }
        }
        assert_eq!(delays, vec![1000, 2000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let feed = MockFeed::new();
        feed.set_error(ProviderError::Network("down".to_string()));
        let controller = controller_with(&feed);
        let mut events = controller.source().subscribe();

        let start = Instant::now();
        let view = controller.fetch().await;

        assert_eq!(feed.call_count(), 4);
        assert!(start.elapsed() >= Duration::from_millis(7000));
        assert_eq!(view.status, QueryStatus::Error);
        assert!(!view.is_loading);
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to load token stats after 4 attempts: Network error: down")
        );
        assert!(view.raw_data.is_none());

        let mut exhausted = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, PriceEvent::RetriesExhausted { attempts: 4, .. }) {
                exhausted += 1;
            }
        }
        assert_eq!(exhausted, 1);

        // No further attempts until asked
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(feed.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_is_not_retried() {
        let feed = MockFeed::new();
        feed.set_error(ProviderError::Unauthorized { status: 401 });
        let controller = controller_with(&feed);

        let view = controller.fetch().await;

        assert_eq!(feed.call_count(), 1);
        assert_eq!(view.status, QueryStatus::Error);
        assert_eq!(
            view.error.as_deref(),
            Some("Unauthorized: HTTP 401, check the configured API key")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_recovers_from_error() {
        let feed = MockFeed::new();
        feed.set_error(ProviderError::Timeout);
        let controller = controller_with(&feed);

        assert_eq!(controller.fetch().await.status, QueryStatus::Error);

        feed.set_payload(sample_payload(0.5));
        let view = controller.refetch().await;

        assert_eq!(view.status, QueryStatus::Success);
        assert!(view.error.is_none());
        let state = controller.subscribe();
        assert_eq!(state.borrow().failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refetch_makes_one_request() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        feed.set_latency(Duration::from_millis(500));
        let controller = controller_with(&feed);

        let (a, b) = tokio::join!(controller.refetch(), controller.refetch());

        assert_eq!(feed.call_count(), 1);
        assert_eq!(a, b);
        assert_eq!(a.status, QueryStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_bypasses_fresh_cache() {
        let feed = MockFeed::new();
        feed.push(Ok(sample_payload(0.5)));
        feed.set_payload(sample_payload(0.6));
        let controller = controller_with(&feed);

        controller.fetch().await;
        assert_eq!(controller.fetch().await.raw_data.unwrap().price_usd, 0.5);
        assert_eq!(feed.call_count(), 1);

        let view = controller.refetch().await;
        assert_eq!(feed.call_count(), 2);
        assert_eq!(view.raw_data.unwrap().price_usd, 0.6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_uses_its_own_clock() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        let controller = controller_with(&feed);

        controller.fetch().await;
        tokio::time::advance(Duration::from_secs(31)).await;

        // Past the 30s stale threshold, still inside the 60s cache TTL
        assert!(controller.get_snapshot().is_stale);
        assert!(controller.source().is_cache_fresh().await);

        // Served from cache, but a successful cycle resets the flag
        let view = controller.fetch().await;
        assert_eq!(feed.call_count(), 1);
        assert!(!view.is_stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_payload_while_revalidating() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        let controller = controller_with(&feed);
        controller.fetch().await;

        feed.set_latency(Duration::from_secs(2));
        feed.set_payload(sample_payload(0.9));
        let background = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refetch().await })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        let during = controller.get_snapshot();
        assert!(during.is_loading);
        assert_eq!(during.status, QueryStatus::Loading);
        assert_eq!(during.raw_data.unwrap().price_usd, 0.5);

        let after = background.await.unwrap();
        assert_eq!(after.raw_data.unwrap().price_usd, 0.9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_keeps_last_good_payload() {
        let feed = MockFeed::new();
        feed.push(Ok(sample_payload(0.5)));
        feed.set_error(ProviderError::Timeout);
        let controller = controller_with(&feed);

        controller.fetch().await;
        let view = controller.refetch().await;

        assert_eq!(view.status, QueryStatus::Error);
        assert!(view.error.is_some());
        assert_eq!(view.raw_data.unwrap().price_usd, 0.5);
        assert_eq!(controller.health_check().status, HealthStatus::Degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_refreshes_on_interval() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        let controller = controller_with(&feed);
        let mut states = controller.subscribe();

        let poller = controller.start_polling();
        states
            .wait_for(|state| state.status == QueryStatus::Success)
            .await
            .unwrap();
        assert_eq!(feed.call_count(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(feed.call_count(), 2);

        poller.stop();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(feed.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_with_slow_feed_refreshes_every_interval() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        feed.set_latency(Duration::from_millis(200));
        let controller = controller_with(&feed);

        let start = Instant::now();
        let _poller = controller.start_polling();

        // Interval equals the cache TTL; every tick must still hit the network
        for (secs, expected) in [(1, 1), (61, 2), (121, 3), (181, 4), (241, 5)] {
            tokio::time::sleep_until(start + Duration::from_secs(secs)).await;
            assert_eq!(feed.call_count(), expected, "calls by {}s", secs);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_tick_reuses_data_from_manual_refetch() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        let controller = controller_with(&feed);

        let start = Instant::now();
        let _poller = controller.start_polling();
        tokio::time::sleep_until(start + Duration::from_secs(30)).await;
        controller.refetch().await;
        assert_eq!(feed.call_count(), 2);

        // The tick at 60s finds data fetched after the previous cycle
        tokio::time::sleep_until(start + Duration::from_secs(61)).await;
        assert_eq!(feed.call_count(), 2);

        tokio::time::sleep_until(start + Duration::from_secs(121)).await;
        assert_eq!(feed.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_poller_lets_cycle_finish() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        feed.set_latency(Duration::from_secs(2));
        let controller = controller_with(&feed);
        let mut states = controller.subscribe();

        let poller = controller.start_polling();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(controller.get_snapshot().status, QueryStatus::Loading);
        poller.stop();

        states
            .wait_for(|state| state.status == QueryStatus::Success)
            .await
            .unwrap();
        let view = controller.get_snapshot();
        assert_eq!(view.raw_data.unwrap().price_usd, 0.5);
        assert!(controller.source().has_cached().await);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(feed.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_retries_after_error_on_next_tick() {
        let feed = MockFeed::new();
        feed.set_error(ProviderError::Network("down".to_string()));
        let controller = controller_with(&feed);
        let mut states = controller.subscribe();

        let start = Instant::now();
        let _poller = controller.start_polling();
        states
            .wait_for(|state| state.status == QueryStatus::Error)
            .await
            .unwrap();
        assert_eq!(feed.call_count(), 4);

        tokio::time::sleep_until(start + Duration::from_millis(59_000)).await;
        assert_eq!(controller.get_snapshot().status, QueryStatus::Error);
        assert_eq!(feed.call_count(), 4);

        // Next tick starts a fresh cycle; the error stays visible while loading
        tokio::time::sleep_until(start + Duration::from_millis(60_500)).await;
        let during = controller.get_snapshot();
        assert_eq!(during.status, QueryStatus::Loading);
        assert!(during.error.is_some());
        assert_eq!(feed.call_count(), 5);

        feed.set_payload(sample_payload(0.5));
        states
            .wait_for(|state| state.status == QueryStatus::Success)
            .await
            .unwrap();
        assert_eq!(feed.call_count(), 6);
        assert!(controller.get_snapshot().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_policy() {
        let feed = MockFeed::new();
        feed.set_error(ProviderError::Timeout);
        let source =
            PriceDataSource::new(Arc::new(feed.clone()), &PriceServiceConfig::default()).unwrap();
        let policy = QueryPolicy::default().with_retry(RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        });
        let controller = PriceQueryController::new(Arc::new(source), policy).unwrap();

        let view = controller.fetch().await;
        assert_eq!(feed.call_count(), 1);
        assert_eq!(
            view.error.as_deref(),
            Some("Failed to load token stats after 1 attempts: Request timeout")
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let feed = MockFeed::new();
        feed.set_payload(sample_payload(0.5));
        let controller = controller_with(&feed);

        assert_eq!(controller.health_check().status, HealthStatus::Unhealthy);
        controller.fetch().await;

        let health = controller.health_check();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.name, "token_stats_query");
        assert_eq!(health.details["feed_name"], serde_json::json!("mock"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_policy() {
        let source = PriceDataSource::new(
            Arc::new(MockFeed::new()),
            &PriceServiceConfig::default(),
        )
        .unwrap();
        let policy = QueryPolicy::default().with_refetch_interval(Duration::ZERO);
        assert!(PriceQueryController::new(Arc::new(source), policy).is_err());
    }
}
