//! One user-facing notification per finished operation.

use mobupps_types::{PredictionResult, SearchResult};
use serde::Serialize;

use crate::Error;
use crate::predict::NEIGHBORS_FIELD;

/// Example shown when pasted neighbor JSON cannot be used
pub const NEIGHBORS_EXAMPLE: &str = r#"[{ "app_id": "app_123", "similarity_score": 0.95 }]"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    #[must_use]
    pub fn search(outcome: &Result<SearchResult, Error>) -> Self {
        match outcome {
            Ok(result) => Self::success(
                "Search Complete",
                format!(
                    "Found {} similar apps using {}",
                    result.similar_apps.len(),
                    result.ab_arm
                ),
            ),
            Err(e) => Self::failure(
                "Search Failed",
                e,
                "Unable to complete search. Please try again.",
            ),
        }
    }

    #[must_use]
    pub fn prediction(outcome: &Result<PredictionResult, Error>) -> Self {
        match outcome {
            Ok(result) => Self::success(
                "Prediction Complete",
                format!(
                    "Score: {:.2} | Latency: {}ms",
                    result.predicted_score, result.latency_ms
                ),
            ),
            Err(Error::Validation { field, message }) if *field == NEIGHBORS_FIELD => Self::error(
                "Invalid JSON",
                format!("{message}. Expected format: {NEIGHBORS_EXAMPLE}"),
            ),
            Err(e) => Self::failure(
                "Prediction Failed",
                e,
                "Unable to complete prediction. Please try again.",
            ),
        }
    }

    #[must_use]
    pub fn metrics_exported() -> Self {
        Self::success(
            "Metrics Exported",
            "Metrics data has been downloaded as JSON",
        )
    }

    #[must_use]
    pub fn metrics_failed(error: &Error) -> Self {
        Self::failure(
            "Metrics Unavailable",
            error,
            "Unable to load metrics. Please try again.",
        )
    }

    fn failure(title: &str, error: &Error, fallback: &str) -> Self {
        let message = error.user_message();
        if error.to_string().is_empty() {
            Self::error(title, fallback)
        } else {
            Self::error(title, message)
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
