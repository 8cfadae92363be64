//! Wire shapes of the MobUpps REST API.
//!
//! Requests serialize exactly as the backend expects them (absent optionals
//! are omitted, never sent as `null` or `{}`). Replies are lenient: optional
//! fields default rather than fail the whole request.

use std::collections::BTreeMap;

use mobupps_types::{AbArm, AppDescriptor, NeighborRef};
use serde::{Deserialize, Serialize};

pub const HEALTH_PATH: &str = "/healthz";
pub const METRICS_PATH: &str = "/metrics";
pub const FIND_SIMILAR_PATH: &str = "/api/v1/find-similar";
pub const PREDICT_PATH: &str = "/api/v1/predict";

/// Body of `POST /api/v1/find-similar`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub app: AppDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Vec<String>>,
}

impl SearchFilters {
    /// Filters for the selected category/region, or `None` when neither is set.
    #[must_use]
    pub fn from_selection(category: Option<&str>, region: Option<&str>) -> Option<Self> {
        let category = category.filter(|c| !c.is_empty());
        let region = region.filter(|r| !r.is_empty());

        if category.is_none() && region.is_none() {
            return None;
        }

        Some(Self {
            category: category.map(|c| vec![c.to_string()]),
            region: region.map(|r| vec![r.to_string()]),
        })
    }
}

/// Reply of `POST /api/v1/find-similar`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchReply {
    pub ab_arm: AbArm,
    #[serde(default, alias = "similar_apps")]
    pub neighbors: Vec<NeighborWire>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// A neighbor as the backend reports it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NeighborWire {
    pub app_id: String,
    #[serde(default, alias = "similarity_score")]
    pub similarity: f64,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Body of `POST /api/v1/predict`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    pub app: AppDescriptor,
    pub neighbors: Vec<NeighborRef>,
    pub ab_arm: AbArm,
}

/// Reply of `POST /api/v1/predict`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictReply {
    pub ab_arm: AbArm,
    pub prediction: PredictionWire,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionWire {
    pub score: f64,
    #[serde(default)]
    pub segments: Vec<String>,
}

/// Reply of `GET /metrics`, as computed server-side
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMetrics {
    #[serde(default)]
    pub uptime_seconds: f64,
    #[serde(default)]
    pub requests: RawRequests,
    #[serde(default)]
    pub latencies: BTreeMap<String, RawLatency>,
    #[serde(default)]
    pub ab_tests: RawAbTests,
    #[serde(default)]
    pub errors: RawErrors,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRequests {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub by_endpoint: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLatency {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub avg_ms: f64,
    #[serde(default)]
    pub min_ms: f64,
    #[serde(default)]
    pub max_ms: f64,
    #[serde(default)]
    pub p50_ms: f64,
    #[serde(default)]
    pub p95_ms: f64,
    #[serde(default)]
    pub p99_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawAbTests {
    #[serde(default)]
    pub total_assignments: u64,
    #[serde(default)]
    pub by_arm: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_endpoint: BTreeMap<String, BTreeMap<String, u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawErrors {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub by_type: BTreeMap<String, u64>,
}

#[cfg(test)]
#[allow(clippy::float_cmp)] // Exact float comparisons are intentional in tests
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_omitted_when_nothing_selected() {
        assert_eq!(SearchFilters::from_selection(None, None), None);
        assert_eq!(SearchFilters::from_selection(Some(""), None), None);

        let request = SearchRequest {
            app: AppDescriptor::named("Fitness Tracker Pro"),
            filters: None,
            top_k: 20,
            partner_id: None,
            app_id: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"app": {"name": "Fitness Tracker Pro"}, "top_k": 20})
        );
    }

    #[test]
    fn test_filters_only_carry_selected_keys() {
        let filters = SearchFilters::from_selection(None, Some("EU")).unwrap();
        assert_eq!(
            serde_json::to_value(&filters).unwrap(),
            json!({"region": ["EU"]})
        );

        let filters = SearchFilters::from_selection(Some("Games"), Some("US")).unwrap();
        assert_eq!(
            serde_json::to_value(&filters).unwrap(),
            json!({"category": ["Games"], "region": ["US"]})
        );
    }

    #[test]
    fn test_search_reply_accepts_backend_shape() {
        let reply: SearchReply = serde_json::from_value(json!({
            "neighbors": [
                {"app_id": "app_1", "similarity": 0.91, "app_name": "Runner", "category": "Health & Fitness"},
                {"app_id": "app_2", "similarity": 0.5}
            ],
            "ab_arm": "v2"
        }))
        .unwrap();

        assert_eq!(reply.ab_arm, AbArm::V2);
        assert_eq!(reply.neighbors.len(), 2);
        assert_eq!(reply.neighbors[1].app_name, None);
        assert_eq!(reply.correlation_id, None);
    }

    #[test]
    fn test_search_reply_accepts_similar_apps_alias() {
        let reply: SearchReply = serde_json::from_value(json!({
            "ab_arm": "v1",
            "similar_apps": [{"app_id": "a", "similarity_score": 0.3}],
            "correlation_id": "cid"
        }))
        .unwrap();

        assert_eq!(reply.neighbors[0].similarity, 0.3);
        assert_eq!(reply.correlation_id.as_deref(), Some("cid"));
    }

    #[test]
    fn test_predict_request_shape() {
        let request = PredictRequest {
            app: AppDescriptor::named("app_456"),
            neighbors: vec![NeighborRef::new("app_123", 0.95)],
            ab_arm: AbArm::V1,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "app": {"name": "app_456"},
                "neighbors": [{"app_id": "app_123", "similarity": 0.95}],
                "ab_arm": "v1"
            })
        );
    }

    #[test]
    fn test_predict_reply_parses() {
        let reply: PredictReply = serde_json::from_value(json!({
            "ab_arm": "v2",
            "prediction": {"score": 0.86, "segments": ["fitness_lovers", "social"]},
            "latency_ms": 3
        }))
        .unwrap();

        assert_eq!(reply.prediction.score, 0.86);
        assert_eq!(reply.prediction.segments, vec!["fitness_lovers", "social"]);
        assert_eq!(reply.latency_ms, 3);
    }

    #[test]
    fn test_raw_metrics_parses_backend_summary() {
        let raw: RawMetrics = serde_json::from_value(json!({
            "uptime_seconds": 3900.25,
            "requests": {
                "total": 200,
                "by_endpoint": {"/api/v1/find-similar": 120, "/api/v1/predict": 80},
                "by_status": {"200": 150, "422": 50}
            },
            "latencies": {
                "/api/v1/find-similar": {
                    "count": 120, "avg_ms": 10.0, "min_ms": 2.0, "max_ms": 40.0,
                    "p50_ms": 8.0, "p95_ms": 30.0, "p99_ms": 39.0
                }
            },
            "ab_tests": {
                "total_assignments": 120,
                "by_arm": {"v1": 70, "v2": 50},
                "by_endpoint": {"/api/v1/find-similar": {"v1": 70, "v2": 50}}
            },
            "errors": {"total": 50, "by_type": {}}
        }))
        .unwrap();

        assert_eq!(raw.requests.total, 200);
        assert_eq!(raw.requests.by_status["200"], 150);
        assert_eq!(raw.latencies["/api/v1/find-similar"].p95_ms, 30.0);
        assert_eq!(raw.ab_tests.by_arm["v2"], 50);
        assert_eq!(raw.errors.total, 50);
    }

    #[test]
    fn test_raw_metrics_empty_document() {
        let raw: RawMetrics = serde_json::from_value(json!({})).unwrap();
        assert_eq!(raw, RawMetrics::default());
    }
}
