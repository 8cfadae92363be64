//! Similar-app search.
//!
//! Builds the `find-similar` request from a [`SearchForm`], maps the reply into
//! display records and remembers successful searches in history.

use mobupps_client::protocol::NeighborWire;
use mobupps_client::{SearchFilters, SearchReply, SearchRequest, Transport, api};
use mobupps_types::{AppDescriptor, SearchResult, SimilarApp, clamp_unit};
use tracing::{debug, info, warn};

use crate::history::{self, HistoryStore};
use crate::state::{LoadingFlag, RequestTracker, Tagged};
use crate::utils::now_iso8601;
use crate::{Error, Result};

/// Category shown for neighbors the backend did not categorize
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Number of neighbors to request: 5 to 50 in steps of 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopK(u32);

impl TopK {
    pub const MIN: u32 = 5;
    pub const MAX: u32 = 50;
    pub const STEP: u32 = 5;
    pub const DEFAULT: Self = Self(20);

    /// # Errors
    ///
    /// Returns a validation error when `value` is out of range or off-step.
    pub fn new(value: u32) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) || value % Self::STEP != 0 {
            return Err(Error::validation(
                "top_k",
                format!(
                    "Top K must be between {} and {} in steps of {}, got {value}",
                    Self::MIN,
                    Self::MAX,
                    Self::STEP
                ),
            ));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What the user filled in on the search form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchForm {
    pub app: AppDescriptor,
    pub filter_category: Option<String>,
    pub filter_region: Option<String>,
    pub top_k: TopK,
    pub partner_id: Option<String>,
    pub app_id: Option<String>,
}

impl SearchForm {
    /// Form for `app`, filtering on the app's own category and region.
    #[must_use]
    pub fn new(app: AppDescriptor) -> Self {
        Self {
            filter_category: app.category.clone(),
            filter_region: app.region.clone(),
            app,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: TopK) -> Self {
        self.top_k = top_k;
        self
    }

    /// Build the request body. Blank optional ids are dropped.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the app name is missing.
    pub fn build_request(&self) -> Result<SearchRequest> {
        if self.app.name.trim().is_empty() {
            return Err(Error::validation("name", "App name is required"));
        }

        Ok(SearchRequest {
            app: self.app.clone(),
            filters: SearchFilters::from_selection(
                self.filter_category.as_deref(),
                self.filter_region.as_deref(),
            ),
            top_k: self.top_k.get(),
            partner_id: non_blank(self.partner_id.as_deref()),
            app_id: non_blank(self.app_id.as_deref()),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Map a backend reply into display records, defaulting missing fields. The
/// correlation id in the reply body wins over the transport's.
#[must_use]
pub fn map_reply(reply: SearchReply, correlation_id: String) -> SearchResult {
    SearchResult {
        ab_arm: reply.ab_arm,
        similar_apps: reply.neighbors.into_iter().map(similar_app).collect(),
        correlation_id: prefer_reported(reply.correlation_id, correlation_id),
    }
}

/// Correlation id reported in a reply body, falling back to `transport_id`.
pub(crate) fn prefer_reported(reported: Option<String>, transport_id: String) -> String {
    reported
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(transport_id)
}

fn similar_app(neighbor: NeighborWire) -> SimilarApp {
    let NeighborWire {
        app_id,
        similarity,
        app_name,
        category,
    } = neighbor;

    if app_name.is_none() || category.is_none() {
        debug!("Defaulting missing name/category for neighbor {app_id}");
    }

    SimilarApp {
        app_name: app_name.unwrap_or_else(|| app_id.clone()),
        category: category.unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        similarity_score: clamp_unit(similarity),
        app_id,
    }
}

/// Runs searches against the backend and records them in history
pub struct SearchOrchestrator<T, H> {
    transport: T,
    history: H,
    tracker: RequestTracker,
    loading: LoadingFlag,
}

impl<T: Transport, H: HistoryStore> SearchOrchestrator<T, H> {
    pub fn new(transport: T, history: H) -> Self {
        Self {
            transport,
            history,
            tracker: RequestTracker::new(),
            loading: LoadingFlag::new(),
        }
    }

    /// Tracker whose tokens tag this orchestrator's results.
    #[must_use]
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    #[must_use]
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Run one search. The loading flag is raised for the duration of the
    /// call and lowered whatever the outcome.
    pub async fn submit(&self, form: &SearchForm) -> Tagged<Result<SearchResult>> {
        let token = self.tracker.issue();
        let _loading = self.loading.begin();
        Tagged::new(token, self.run(form).await)
    }

    async fn run(&self, form: &SearchForm) -> Result<SearchResult> {
        let request = form.build_request()?;
        let reply = api::find_similar(&self.transport, &request).await?;
        let result = map_reply(reply.data, reply.correlation_id);

        info!(
            "Found {} similar apps using {} [cid:{}]",
            result.similar_apps.len(),
            result.ab_arm,
            result.correlation_id
        );

        if let Err(e) = history::record(&self.history, request.app, now_iso8601()) {
            warn!("Failed to save search history: {e}");
        }

        Ok(result)
    }
}
