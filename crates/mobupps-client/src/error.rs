//! Error type for the mobupps-client crate.
//!
//! Every failure on the way to the backend and back (connection problems,
//! timeouts, non-2xx statuses, unreadable bodies) ends up as a [`NetworkError`],
//! so callers never branch on transport internals.

/// Unified error type for transport operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct NetworkError {
    /// Human-readable description, safe to show to the user
    pub message: String,
    /// HTTP status when the backend answered at all
    pub status: Option<u16>,
}

impl NetworkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Error for a non-2xx reply. Uses the backend's `detail` field when the
    /// body carries one.
    #[must_use]
    pub fn from_status(status: u16, path: &str, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| match value.get("detail") {
                Some(serde_json::Value::String(detail)) => Some(detail.clone()),
                Some(other) if !other.is_null() => Some(other.to_string()),
                _ => None,
            });

        let message = match detail {
            Some(detail) => format!("Request to {path} failed with status {status}: {detail}"),
            None => format!("Request to {path} failed with status {status}"),
        };

        Self {
            message,
            status: Some(status),
        }
    }

    /// Error for a 2xx reply whose body does not match the expected shape.
    #[must_use]
    pub fn invalid_body(path: &str, err: &serde_json::Error) -> Self {
        Self::new(format!("Invalid response from {path}: {err}"))
    }

    /// Message with a generic retry suggestion appended.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.message.is_empty() {
            "Request failed. Please try again.".to_string()
        } else {
            format!("{}. Please try again.", self.message.trim_end_matches('.'))
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timeout".to_string()
        } else if err.is_connect() {
            "Unable to reach the MobUpps API".to_string()
        } else {
            err.to_string()
        };

        Self {
            message,
            status: err.status().map(|status| status.as_u16()),
        }
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_without_body() {
        let err = NetworkError::from_status(503, "/metrics", b"");
        assert_eq!(err.status, Some(503));
        assert_eq!(err.to_string(), "Request to /metrics failed with status 503");
    }

    #[test]
    fn test_from_status_uses_detail() {
        let body = br#"{"detail": "top_k must be <= 100"}"#;
        let err = NetworkError::from_status(422, "/api/v1/find-similar", body);
        assert_eq!(err.status, Some(422));
        assert!(err.message.contains("top_k must be <= 100"));
    }

    #[test]
    fn test_from_status_structured_detail() {
        let body = br#"{"detail": [{"loc": ["body", "app"], "msg": "field required"}]}"#;
        let err = NetworkError::from_status(422, "/api/v1/predict", body);
        assert!(err.message.contains("field required"));
    }

    #[test]
    fn test_invalid_body() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = NetworkError::invalid_body("/healthz", &json_err);
        assert!(err.message.starts_with("Invalid response from /healthz"));
        assert_eq!(err.status, None);
    }

    #[test]
    fn test_user_message_suggests_retry() {
        let err = NetworkError::new("Request timeout");
        assert_eq!(err.user_message(), "Request timeout. Please try again.");

        let err = NetworkError::new("");
        assert_eq!(err.user_message(), "Request failed. Please try again.");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: NetworkError = json_err.into();
        assert!(err.message.contains("JSON error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<i32> {
            Err(NetworkError::new("boom"))
        }
        assert_eq!(returns_error().unwrap_err().to_string(), "boom");
    }
}
