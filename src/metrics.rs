//! Request statistics for the churn service.

use crate::types::Label;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by the request handlers
pub struct ServiceMetrics {
    /// Predictions returned to callers
    pub predictions: AtomicU64,
    pub churn_predictions: AtomicU64,
    /// Requests rejected as invalid input
    pub rejected: AtomicU64,
    /// Requests failed with an internal error
    pub internal_errors: AtomicU64,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Churn probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            churn_predictions: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, latency: Duration, label: Label, probability: f64) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        if label == Label::Churn {
            self.churn_predictions.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_internal_error(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Latency percentiles over the retained window
    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Predictions per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            predictions: self.predictions.load(Ordering::Relaxed),
            churn_predictions: self.churn_predictions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            throughput: self.throughput(),
            latency: self.latency_stats(),
            probability_distribution: self.probability_distribution(),
        }
    }

    /// Log a summary of the counters
    pub fn print_summary(&self) {
        let s = self.snapshot();
        let churn_rate = if s.predictions > 0 {
            s.churn_predictions as f64 / s.predictions as f64 * 100.0
        } else {
            0.0
        };

        info!(
            predictions = s.predictions,
            churn_rate = format!("{churn_rate:.1}%"),
            rejected = s.rejected,
            internal_errors = s.internal_errors,
            throughput = format!("{:.2} req/s", s.throughput),
            mean_us = s.latency.mean_us,
            p95_us = s.latency.p95_us,
            p99_us = s.latency.p99_us,
            "Service metrics"
        );
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Body of `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions: u64,
    pub churn_predictions: u64,
    pub rejected: u64,
    pub internal_errors: u64,
    pub throughput: f64,
    pub latency: LatencyStats,
    pub probability_distribution: [u64; 10],
}

/// Prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), Label::Churn, 0.9);
        metrics.record_prediction(Duration::from_micros(300), Label::NoChurn, 0.1);
        metrics.record_rejected();
        metrics.record_internal_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions, 2);
        assert_eq!(snapshot.churn_predictions, 1);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.internal_errors, 1);
        assert_eq!(snapshot.latency.mean_us, 200);
        assert_eq!(snapshot.latency.max_us, 300);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = ServiceMetrics::new();
        metrics.record_prediction(Duration::from_micros(1), Label::Churn, 1.0);
        metrics.record_prediction(Duration::from_micros(1), Label::NoChurn, 0.0);
        metrics.record_prediction(Duration::from_micros(1), Label::NoChurn, 0.35);

        let dist = metrics.probability_distribution();
        assert_eq!(dist[9], 1);
        assert_eq!(dist[0], 1);
        assert_eq!(dist[3], 1);
    }

    #[test]
    fn test_empty_latency_stats() {
        let stats = ServiceMetrics::new().latency_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.p99_us, 0);
    }
}
