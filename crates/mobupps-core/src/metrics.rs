//! Metrics normalization.
//!
//! Turns the backend's `/metrics` document into the [`MetricsSnapshot`] the
//! dashboard renders. Per-endpoint statistics are already computed
//! server-side; this only renames, defaults and derives.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use mobupps_client::protocol::{RawAbTests, RawLatency};
use mobupps_client::{RawMetrics, Transport, api};
use mobupps_types::{AbTesting, EndpointArms, EndpointLatencyStats, MetricsSnapshot};
use tracing::{debug, warn};

use crate::Result;

/// Build the canonical snapshot from a raw backend document.
#[must_use]
pub fn normalize(raw: RawMetrics) -> MetricsSnapshot {
    let avg_latency_ms = mean_latency(&raw.latencies);

    let latency_stats = raw
        .latencies
        .into_iter()
        .map(|(endpoint, stats)| {
            let stats = latency_stats(stats);
            if !is_ordered(&stats) {
                warn!("Latency percentiles out of order for {endpoint}: {stats:?}");
            }
            (endpoint, stats)
        })
        .collect();

    MetricsSnapshot {
        total_requests: raw.requests.total,
        avg_latency_ms,
        requests_by_endpoint: raw.requests.by_endpoint,
        status_codes: raw.requests.by_status,
        ab_testing: ab_testing(raw.ab_tests),
        latency_stats,
        uptime_seconds: raw.uptime_seconds.max(0.0),
        error_count: raw.errors.total,
    }
}

/// Mean of each endpoint's average latency; 0 when there are no endpoints.
#[must_use]
// Endpoint counts are tiny; the f64 conversion is exact
#[allow(clippy::cast_precision_loss)]
pub fn mean_latency(latencies: &BTreeMap<String, RawLatency>) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }
    let sum: f64 = latencies.values().map(|stats| stats.avg_ms).sum();
    sum / latencies.len() as f64
}

fn latency_stats(raw: RawLatency) -> EndpointLatencyStats {
    EndpointLatencyStats {
        count: raw.count,
        avg: raw.avg_ms,
        min: raw.min_ms,
        max: raw.max_ms,
        p50: raw.p50_ms,
        p95: raw.p95_ms,
        p99: raw.p99_ms,
    }
}

fn is_ordered(stats: &EndpointLatencyStats) -> bool {
    stats.min <= stats.p50 && stats.p50 <= stats.p95 && stats.p95 <= stats.p99 && stats.p99 <= stats.max
}

fn ab_testing(raw: RawAbTests) -> AbTesting {
    let arm = |counts: &BTreeMap<String, u64>, name: &str| counts.get(name).copied().unwrap_or(0);

    let by_endpoint = raw
        .by_endpoint
        .iter()
        .map(|(endpoint, arms)| {
            (
                endpoint.clone(),
                EndpointArms {
                    v1: arm(arms, "v1"),
                    v2: arm(arms, "v2"),
                },
            )
        })
        .collect();

    AbTesting {
        v1_count: arm(&raw.by_arm, "v1"),
        v2_count: arm(&raw.by_arm, "v2"),
        by_endpoint,
    }
}

/// Something that can produce a fresh metrics snapshot
pub trait MetricsSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<MetricsSnapshot>> + Send;
}

impl<S: MetricsSource> MetricsSource for Arc<S> {
    fn fetch(&self) -> impl Future<Output = Result<MetricsSnapshot>> + Send {
        (**self).fetch()
    }
}

/// Metrics read from the backend's `/metrics` endpoint
#[derive(Debug, Clone)]
pub struct BackendMetrics<T> {
    transport: T,
}

impl<T: Transport> BackendMetrics<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: Transport> MetricsSource for BackendMetrics<T> {
    async fn fetch(&self) -> Result<MetricsSnapshot> {
        let reply = api::metrics(&self.transport).await?;
        debug!("Fetched metrics [cid:{}]", reply.correlation_id);
        Ok(normalize(reply.data))
    }
}
