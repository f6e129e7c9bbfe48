//! Fetch metrics collection and reporting
//!
//! Tracks network latency percentiles and outcome counters for one data
//! source. Cache hits never touch the network and are counted separately.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of latency samples to keep
const MAX_SAMPLES: usize = 100;

/// Point-in-time metrics for a data source
#[derive(Debug, Clone, PartialEq)]
pub struct FetchMetrics {
    /// Name of the feed behind the source
    pub feed_name: String,
    /// 50th percentile latency of successful requests in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful requests in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0) over all network requests
    pub success_rate: f64,
    /// Network requests issued
    pub total_requests: u64,
    /// Network requests that failed
    pub failed_requests: u64,
    /// Calls answered from a fresh cache
    pub cache_hits: u64,
    /// Failures answered with stale cached data
    pub stale_fallbacks: u64,
}

#[derive(Debug, Clone, Copy)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    total_requests: u64,
    failed_requests: u64,
    cache_hits: u64,
    stale_fallbacks: u64,
}

/// Collects metrics for one data source
pub struct MetricsCollector {
    feed_name: String,
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    pub fn new(feed_name: &str) -> Self {
        Self {
            feed_name: feed_name.to_string(),
            counters: RwLock::new(Counters {
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                ..Counters::default()
            }),
        }
    }

    /// Records a network request with its duration and outcome
    pub async fn record_request(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.total_requests += 1;
        if !success {
            counters.failed_requests += 1;
        }
        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    pub async fn record_cache_hit(&self) {
        self.counters.write().await.cache_hits += 1;
    }

    pub async fn record_stale_fallback(&self) {
        self.counters.write().await.stale_fallbacks += 1;
    }

    /// Computes current metrics from collected samples
    pub async fn snapshot(&self) -> FetchMetrics {
        let counters = self.counters.read().await;

        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if counters.total_requests > 0 {
            (counters.total_requests - counters.failed_requests) as f64
                / counters.total_requests as f64
        } else {
            1.0
        };

        FetchMetrics {
            feed_name: self.feed_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: counters.total_requests,
            failed_requests: counters.failed_requests,
            cache_hits: counters.cache_hits,
            stale_fallbacks: counters.stale_fallbacks,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
