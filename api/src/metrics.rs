//! In-process request metrics: counters plus latency percentiles.
//!
//! Each endpoint owns a bucket with monotonically increasing counters
//! and a bounded ring of the most recent latencies. Statistics are
//! derived on read from a single sorted copy. Buckets reset lazily
//! when first touched more than one hour after their period start, so
//! the endpoint reports hourly rolling numbers without background
//! work. Adequate for dashboards, not SLO accounting.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Latency samples kept per endpoint.
const RING_CAPACITY: usize = 1000;
/// Rolling period after which a bucket starts over.
const PERIOD: Duration = Duration::from_secs(3600);

/// Endpoints tracked from process start so the metrics response always
/// lists all of them, observed or not.
const TRACKED_ENDPOINTS: [&str; 4] = ["chat", "retrieve", "metrics", "health"];

#[derive(Debug)]
struct Bucket {
    count: u64,
    errors: u64,
    rate_limit_hits: u64,
    latencies: VecDeque<u64>,
    period_start: Instant,
}

impl Bucket {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            errors: 0,
            rate_limit_hits: 0,
            latencies: VecDeque::with_capacity(RING_CAPACITY),
            period_start: now,
        }
    }

    fn reset_if_stale(&mut self, now: Instant) {
        if now.duration_since(self.period_start) > PERIOD {
            *self = Bucket::new(now);
        }
    }
}

/// Derived per-endpoint statistics. All zeros when nothing was observed.
#[derive(Clone, Debug, Serialize)]
pub struct EndpointStats {
    pub count: u64,
    pub errors: u64,
    pub error_rate: f64,
    pub rate_limit_hits: u64,
    pub avg_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}

/// Process-wide metrics registry; one lock over all buckets is enough
/// because each operation is a short O(ring) touch.
pub struct MetricsRegistry {
    buckets: Mutex<HashMap<&'static str, Bucket>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let now = Instant::now();
        let buckets = TRACKED_ENDPOINTS
            .iter()
            .map(|endpoint| (*endpoint, Bucket::new(now)))
            .collect();
        Self {
            buckets: Mutex::new(buckets),
        }
    }

    /// Records one handled request, error or not.
    pub fn observe(&self, endpoint: &'static str, latency_ms: u64, is_error: bool) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().expect("metrics lock");
        let bucket = buckets.entry(endpoint).or_insert_with(|| Bucket::new(now));
        bucket.reset_if_stale(now);

        bucket.count += 1;
        if is_error {
            bucket.errors += 1;
        }
        if bucket.latencies.len() == RING_CAPACITY {
            bucket.latencies.pop_front();
        }
        bucket.latencies.push_back(latency_ms);
    }

    /// Counts one rejected-by-quota request.
    pub fn rate_limit_hit(&self, endpoint: &'static str) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().expect("metrics lock");
        let bucket = buckets.entry(endpoint).or_insert_with(|| Bucket::new(now));
        bucket.reset_if_stale(now);
        bucket.rate_limit_hits += 1;
    }

    /// Consistent snapshot of every bucket's derived statistics.
    pub fn snapshot(&self) -> BTreeMap<String, EndpointStats> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().expect("metrics lock");

        buckets
            .iter_mut()
            .map(|(endpoint, bucket)| {
                bucket.reset_if_stale(now);

                let mut sorted: Vec<u64> = bucket.latencies.iter().copied().collect();
                sorted.sort_unstable();

                let avg_ms = if sorted.is_empty() {
                    0.0
                } else {
                    sorted.iter().sum::<u64>() as f64 / sorted.len() as f64
                };

                let stats = EndpointStats {
                    count: bucket.count,
                    errors: bucket.errors,
                    error_rate: bucket.errors as f64 / (bucket.count.max(1)) as f64,
                    rate_limit_hits: bucket.rate_limit_hits,
                    avg_ms,
                    p50_ms: percentile(&sorted, 50),
                    p95_ms: percentile(&sorted, 95),
                    p99_ms: percentile(&sorted, 99),
                };
                (endpoint.to_string(), stats)
            })
            .collect()
    }
}

/// Nearest-rank percentile over an already-sorted slice:
/// `sorted[ceil((p/100)·n) − 1]`, clamped to valid indices. Zero for
/// empty input, never NaN.
fn percentile(sorted: &[u64], p: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}
