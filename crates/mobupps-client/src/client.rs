//! HTTP client for the MobUpps backend.
//!
//! Wraps a `reqwest::Client` bound to one base URL. Every call gets a fresh
//! correlation id which is sent as a request header; if the backend echoes a
//! correlation id of its own, that one wins.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{NetworkError, Result};
use crate::transport::{CORRELATION_HEADER, Envelope, Method, Transport};

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`Transport`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Build a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client for the default local backend.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if the underlying HTTP client cannot be built.
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for HttpClient {
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Envelope> {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        let mut request = match method {
            Method::Get => self.http.get(self.url(path)),
            Method::Post => self.http.post(self.url(path)),
        }
        .header(ACCEPT, "application/json")
        .header(CORRELATION_HEADER, request_id.as_str());

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(&body)?);
        }

        let response = request.send().await.map_err(|e| {
            warn!("{method} {path} failed before a reply [cid:{request_id}]: {e}");
            NetworkError::from(e)
        })?;

        let status = response.status();
        let correlation_id = response
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map_or(request_id, str::to_string);

        let bytes = response.bytes().await?;

        debug!(
            "{method} {path} -> {} in {}ms [cid:{correlation_id}]",
            status.as_u16(),
            started.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(NetworkError::from_status(status.as_u16(), path, &bytes));
        }

        let data = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| NetworkError::invalid_body(path, &e))?
        };

        Ok(Envelope {
            data,
            correlation_id,
        })
    }
}
