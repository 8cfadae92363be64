//! Performance prediction.
//!
//! Users paste neighbor lists as free-form JSON, with the similarity under
//! either `similarity` or `similarity_score`. Everything is canonicalized to
//! [`NeighborRef`] here, before a request is built; nothing past this module
//! sees the alternate field name.

use mobupps_client::{PredictReply, PredictRequest, Transport, api};
use mobupps_types::{
    AbArm, AppDescriptor, NeighborRef, PredictionResult, SearchResult, clamp_score, clamp_unit,
};
use serde_json::Value;
use tracing::info;

use crate::search::prefer_reported;
use crate::state::{LoadingFlag, RequestTracker, Tagged};
use crate::{Error, Result};

/// Field name reported by neighbor validation errors
pub const NEIGHBORS_FIELD: &str = "neighbors";

/// App name used when predicting straight from search results without one
pub const SEARCH_APP_NAME: &str = "Search App";

/// What the user filled in on the prediction form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictForm {
    pub app_id: String,
    pub app_name: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub pricing: Option<String>,
    /// Comma-separated feature list, e.g. `"sharing, tracking"`
    pub features: Option<String>,
    /// Pasted JSON array of neighbors
    pub neighbors_json: String,
    pub ab_arm: AbArm,
}

impl PredictForm {
    pub fn new(app_id: impl Into<String>, neighbors_json: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            neighbors_json: neighbors_json.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_arm(mut self, ab_arm: AbArm) -> Self {
        self.ab_arm = ab_arm;
        self
    }

    /// Validate the form and build the request body.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing app id or unusable neighbor JSON.
    pub fn build_request(&self) -> Result<PredictRequest> {
        let app_id = self.app_id.trim();
        if app_id.is_empty() {
            return Err(Error::validation("app_id", "App ID is required"));
        }

        let neighbors = parse_neighbors(&self.neighbors_json)?;

        let name = self
            .app_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(app_id);

        let mut app = AppDescriptor {
            category: self.category.clone(),
            region: self.region.clone(),
            pricing: self.pricing.clone(),
            ..AppDescriptor::named(name)
        };
        if let Some(features) = self.features.as_deref().filter(|f| !f.trim().is_empty()) {
            app = app.with_features(split_features(features));
        }

        Ok(PredictRequest {
            app,
            neighbors,
            ab_arm: self.ab_arm,
        })
    }
}

/// Split a comma-separated feature list, trimming each entry.
#[must_use]
pub fn split_features(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|feature| !feature.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse pasted neighbor JSON into canonical references.
///
/// # Errors
///
/// Returns a validation error when the text is blank, is not valid JSON, is not
/// an array, or holds an element that cannot be canonicalized.
pub fn parse_neighbors(text: &str) -> Result<Vec<NeighborRef>> {
    if text.trim().is_empty() {
        return Err(Error::validation(
            NEIGHBORS_FIELD,
            "Neighbor results are required",
        ));
    }

    let value: Value = serde_json::from_str(text).map_err(|e| {
        Error::validation(
            NEIGHBORS_FIELD,
            format!("Neighbor results must be valid JSON ({e})"),
        )
    })?;

    let Value::Array(items) = value else {
        return Err(Error::validation(
            NEIGHBORS_FIELD,
            "Neighbor results must be a JSON array",
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| canonicalize_neighbor(index, item))
        .collect()
}

/// Canonicalize one neighbor element. A non-zero `similarity_score` wins over
/// `similarity`; a zero, blank or missing value falls through to the next
/// field, and to 0 when neither is set. Numeric strings such as `"0.9"` are
/// accepted.
///
/// # Errors
///
/// Returns a validation error when the element is not an object, has no
/// string `app_id`, or carries a similarity that is not a number.
pub fn canonicalize_neighbor(index: usize, item: &Value) -> Result<NeighborRef> {
    let Value::Object(fields) = item else {
        return Err(Error::validation(
            NEIGHBORS_FIELD,
            format!("Neighbor {index} must be a JSON object"),
        ));
    };

    let app_id = match fields.get("app_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            return Err(Error::validation(
                NEIGHBORS_FIELD,
                format!("Neighbor {index} is missing app_id"),
            ));
        }
    };

    let mut similarity = 0.0;
    for key in ["similarity_score", "similarity"] {
        let Some(value) = fields.get(key) else {
            continue;
        };
        match similarity_value(value) {
            Some(score) if score.abs() > 0.0 => {
                similarity = score;
                break;
            }
            Some(_) => {}
            None => {
                return Err(Error::validation(
                    NEIGHBORS_FIELD,
                    format!("Neighbor {index} has a non-numeric {key}"),
                ));
            }
        }
    }

    Ok(NeighborRef::new(app_id, similarity))
}

/// Numeric reading of a similarity field. `null` and blank strings read as 0.
fn similarity_value(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64(),
        Value::String(text) if text.trim().is_empty() => Some(0.0),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Map a backend reply into the display model. The correlation id in the
/// reply body wins over the transport's.
#[must_use]
pub fn map_reply(reply: PredictReply, correlation_id: String) -> PredictionResult {
    let predicted_score = clamp_score(reply.prediction.score);
    PredictionResult {
        predicted_score,
        user_segments: reply.prediction.segments,
        // TODO: use the backend's confidence once /predict reports one
        confidence: clamp_unit(predicted_score),
        latency_ms: reply.latency_ms,
        ab_arm: reply.ab_arm,
        correlation_id: prefer_reported(reply.correlation_id, correlation_id),
    }
}

/// Runs predictions against the backend
pub struct PredictOrchestrator<T> {
    transport: T,
    tracker: RequestTracker,
    loading: LoadingFlag,
}

impl<T: Transport> PredictOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            tracker: RequestTracker::new(),
            loading: LoadingFlag::new(),
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Validate the form and run one prediction. Nothing is sent when the
    /// form is invalid.
    pub async fn submit(&self, form: &PredictForm) -> Tagged<Result<PredictionResult>> {
        let token = self.tracker.issue();
        let _loading = self.loading.begin();
        let outcome = match form.build_request() {
            Ok(request) => self.run(&request).await,
            Err(e) => Err(e),
        };
        Tagged::new(token, outcome)
    }

    /// Predict from the neighbors of a finished search, on the arm the search
    /// was routed to.
    pub async fn predict_from_search(
        &self,
        search: &SearchResult,
        app: Option<AppDescriptor>,
    ) -> Tagged<Result<PredictionResult>> {
        let token = self.tracker.issue();
        let _loading = self.loading.begin();
        let request = PredictRequest {
            app: app.unwrap_or_else(|| AppDescriptor::named(SEARCH_APP_NAME)),
            neighbors: search.similar_apps.iter().map(NeighborRef::from).collect(),
            ab_arm: search.ab_arm,
        };
        Tagged::new(token, self.run(&request).await)
    }

    async fn run(&self, request: &PredictRequest) -> Result<PredictionResult> {
        let reply = api::predict(&self.transport, request).await?;
        let result = map_reply(reply.data, reply.correlation_id);
        info!(
            "Predicted score {:.2} on {} in {}ms [cid:{}]",
            result.predicted_score, result.ab_arm, result.latency_ms, result.correlation_id
        );
        Ok(result)
    }
}
