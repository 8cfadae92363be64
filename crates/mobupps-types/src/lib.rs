//! Shared types for MobUpps dashboard components.
//!
//! This crate provides the display-ready model produced by mobupps-core and
//! consumed by whatever renders it. All types are serializable so snapshots
//! can be exported and search history can be persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound of a predicted performance score
pub const PREDICTED_SCORE_MAX: f64 = 5.0;

/// Clamp a ratio into `[0, 1]`. NaN becomes 0.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Clamp a predicted score into `[0, PREDICTED_SCORE_MAX]`. NaN becomes 0.
#[must_use]
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, PREDICTED_SCORE_MAX)
    }
}

/// A/B arm a request was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbArm {
    #[default]
    V1,
    V2,
}

impl AbArm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl fmt::Display for AbArm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown A/B arm or refresh interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for ParseError {}

impl FromStr for AbArm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            _ => Err(ParseError {
                kind: "A/B arm",
                value: s.to_string(),
            }),
        }
    }
}

/// The app a user searches for or asks a prediction about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<String>,
    /// Distinct feature tags in selection order; `None` when nothing was selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

impl AppDescriptor {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set features, dropping blanks and duplicates. An empty set becomes `None`.
    #[must_use]
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: Vec<String> = Vec::new();
        for feature in features {
            let feature: String = feature.into();
            let feature = feature.trim();
            if !feature.is_empty() && !set.iter().any(|f| f == feature) {
                set.push(feature.to_string());
            }
        }
        self.features = if set.is_empty() { None } else { Some(set) };
        self
    }
}

/// One similar app as displayed in search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarApp {
    pub app_id: String,
    pub app_name: String,
    pub category: String,
    /// Always in `[0, 1]`
    pub similarity_score: f64,
}

impl SimilarApp {
    /// Similarity rendered as a percentage with one decimal, e.g. `"87.5%"`.
    #[must_use]
    pub fn similarity_percent(&self) -> String {
        format!("{:.1}%", self.similarity_score * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub ab_arm: AbArm,
    pub similar_apps: Vec<SimilarApp>,
    pub correlation_id: String,
}

/// Canonical neighbor reference accepted by the prediction endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRef {
    pub app_id: String,
    pub similarity: f64,
}

impl NeighborRef {
    #[must_use]
    pub fn new(app_id: impl Into<String>, similarity: f64) -> Self {
        Self {
            app_id: app_id.into(),
            similarity: clamp_unit(similarity),
        }
    }
}

impl From<&SimilarApp> for NeighborRef {
    fn from(app: &SimilarApp) -> Self {
        Self::new(app.app_id.clone(), app.similarity_score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Always in `[0, PREDICTED_SCORE_MAX]`
    pub predicted_score: f64,
    pub user_segments: Vec<String>,
    /// Placeholder: mirrors the predicted score clamped into `[0, 1]` until the
    /// backend reports a real confidence measure.
    pub confidence: f64,
    pub latency_ms: u64,
    pub ab_arm: AbArm,
    pub correlation_id: String,
}

impl PredictionResult {
    /// Predicted score as a share of the maximum, in `[0, 100]`.
    #[must_use]
    pub fn score_percent(&self) -> f64 {
        self.predicted_score / PREDICTED_SCORE_MAX * 100.0
    }
}

/// Per-endpoint latency statistics in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointLatencyStats {
    #[serde(default)]
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Per-endpoint A/B assignment counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointArms {
    pub v1: u64,
    pub v2: u64,
}

impl EndpointArms {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.v1 + self.v2
    }

    /// Share of v1 traffic in percent; an even split when nothing was recorded.
    #[must_use]
    pub fn v1_percent(&self) -> f64 {
        split_percent(self.v1, self.v2).v1_percent
    }
}

/// Traffic split between arms, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficSplit {
    pub v1_percent: f64,
    pub v2_percent: f64,
}

// Counters stay far below 2^52 so the f64 conversion is exact
#[allow(clippy::cast_precision_loss)]
fn split_percent(v1: u64, v2: u64) -> TrafficSplit {
    let total = v1 + v2;
    if total == 0 {
        return TrafficSplit {
            v1_percent: 50.0,
            v2_percent: 50.0,
        };
    }
    TrafficSplit {
        v1_percent: v1 as f64 / total as f64 * 100.0,
        v2_percent: v2 as f64 / total as f64 * 100.0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbTesting {
    pub v1_count: u64,
    pub v2_count: u64,
    pub by_endpoint: BTreeMap<String, EndpointArms>,
}

impl AbTesting {
    #[must_use]
    pub fn split(&self) -> TrafficSplit {
        split_percent(self.v1_count, self.v2_count)
    }
}

/// Canonical metrics aggregate the dashboard renders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub avg_latency_ms: f64,
    pub requests_by_endpoint: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<String, u64>,
    pub ab_testing: AbTesting,
    pub latency_stats: BTreeMap<String, EndpointLatencyStats>,
    pub uptime_seconds: f64,
    #[serde(default)]
    pub error_count: u64,
}

impl MetricsSnapshot {
    /// Share of HTTP 200 responses, e.g. `"75.0%"`.
    #[must_use]
    pub fn success_rate(&self) -> String {
        let ok = self.status_codes.get("200").copied().unwrap_or(0);
        format_success_rate(ok, self.total_requests)
    }

    #[must_use]
    pub fn uptime(&self) -> String {
        format_uptime(self.uptime_seconds)
    }

    #[must_use]
    pub fn overview(&self) -> MetricsOverview {
        MetricsOverview {
            total_requests: group_thousands(self.total_requests),
            avg_latency: format!("{:.1}ms", self.avg_latency_ms),
            uptime: self.uptime(),
            success_rate: self.success_rate(),
        }
    }
}

/// Headline figures of a snapshot, already formatted for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsOverview {
    pub total_requests: String,
    pub avg_latency: String,
    pub uptime: String,
    pub success_rate: String,
}

/// Render a success ratio as a one-decimal percentage; `"0.0%"` when `total` is 0.
#[must_use]
// Counters stay far below 2^52 so the f64 conversion is exact
#[allow(clippy::cast_precision_loss)]
pub fn format_success_rate(success: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", success as f64 / total as f64 * 100.0)
}

/// Render uptime as `"{d}d {h}h"`, `"{h}h {m}m"` or `"{m}m"`.
#[must_use]
// Uptime is non-negative and floored before truncation
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_uptime(seconds: f64) -> String {
    let secs = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// `1234567` becomes `"1,234,567"`.
#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// A submitted search remembered in client-side history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub app: AppDescriptor,
    /// ISO-8601 time the search completed
    pub timestamp: String,
}

/// Backend liveness as reported by `/healthz`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub uptime_seconds: f64,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }

    /// Status text for a probe outcome; `"Unknown"` when the probe failed.
    #[must_use]
    pub fn label(probe: Option<&Self>) -> &str {
        probe.map_or("Unknown", |health| health.status.as_str())
    }
}

/// How often the metrics view refreshes itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RefreshInterval {
    #[default]
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "5s")]
    FiveSeconds,
    #[serde(rename = "10s")]
    TenSeconds,
    #[serde(rename = "30s")]
    ThirtySeconds,
}

impl RefreshInterval {
    pub const ALL: [Self; 4] = [
        Self::Manual,
        Self::FiveSeconds,
        Self::TenSeconds,
        Self::ThirtySeconds,
    ];

    /// Tick period, or `None` for manual refresh.
    #[must_use]
    pub fn period(self) -> Option<Duration> {
        match self {
            Self::Manual => None,
            Self::FiveSeconds => Some(Duration::from_secs(5)),
            Self::TenSeconds => Some(Duration::from_secs(10)),
            Self::ThirtySeconds => Some(Duration::from_secs(30)),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::FiveSeconds => "5s",
            Self::TenSeconds => "10s",
            Self::ThirtySeconds => "30s",
        }
    }
}

impl fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshInterval {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s_norm = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s_norm)
            .ok_or_else(|| ParseError {
                kind: "refresh interval",
                value: s.to_string(),
            })
    }
}


/// Property-based tests for the display helpers.
#[cfg(test)]
mod proptest_display_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn uptime_has_one_of_three_shapes(secs in 0u64..10_000_000) {
            #[allow(clippy::cast_precision_loss)]
            let text = format_uptime(secs as f64);
            let days = secs / 86_400;
            if days > 0 {
                let prefix = days.to_string() + "d ";
                prop_assert!(text.starts_with(&prefix));
                prop_assert!(text.ends_with('h'));
            } else {
                prop_assert!(text.ends_with('m'));
            }
        }

        #[test]
        fn clamp_unit_stays_in_range(value in proptest::num::f64::ANY) {
            let clamped = clamp_unit(value);
            prop_assert!((0.0..=1.0).contains(&clamped));
        }

        #[test]
        fn clamp_score_stays_in_range(value in proptest::num::f64::ANY) {
            let clamped = clamp_score(value);
            prop_assert!((0.0..=PREDICTED_SCORE_MAX).contains(&clamped));
        }

        #[test]
        fn success_rate_is_percentage(ok in 0u64..10_000, extra in 0u64..10_000) {
            let text = format_success_rate(ok, ok + extra);
            prop_assert!(text.ends_with('%'));
            let value: f64 = text.trim_end_matches('%').parse().unwrap();
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }
}
