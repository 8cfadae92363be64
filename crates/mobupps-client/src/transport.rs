//! Transport abstraction shared by the HTTP client and test doubles.
//!
//! A [`Transport`] performs one request and hands back the parsed JSON body
//! together with the correlation id that pairs the request with its reply.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{NetworkError, Result};

/// Header carrying the correlation id in both directions
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// HTTP methods used by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw reply of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub data: Value,
    pub correlation_id: String,
}

impl Envelope {
    /// Deserialize the body into `T`, keeping the correlation id.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(self, path: &str) -> Result<Decoded<T>> {
        let data =
            serde_json::from_value(self.data).map_err(|e| NetworkError::invalid_body(path, &e))?;
        Ok(Decoded {
            data,
            correlation_id: self.correlation_id,
        })
    }
}

/// Typed reply of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub data: T,
    pub correlation_id: String,
}

/// Something that can issue a request to the backend.
///
/// Implementations must fail with [`NetworkError`] on transport failure or on
/// any non-2xx status, and must always produce a correlation id: the one the
/// backend echoed, or one generated for the call.
pub trait Transport: Send + Sync {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Envelope>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Envelope>> + Send {
        (**self).call(method, path, body)
    }
}

impl<T: Transport> Transport for &T {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Envelope>> + Send {
        (**self).call(method, path, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Health {
        status: String,
    }

    #[test]
    fn test_decode_keeps_correlation_id() {
        let envelope = Envelope {
            data: json!({"status": "healthy"}),
            correlation_id: "cid-1".to_string(),
        };
        let decoded: Decoded<Health> = envelope.decode("/healthz").unwrap();
        assert_eq!(decoded.data.status, "healthy");
        assert_eq!(decoded.correlation_id, "cid-1");
    }

    #[test]
    fn test_decode_mismatch_is_network_error() {
        let envelope = Envelope {
            data: json!({"state": 1}),
            correlation_id: "cid-2".to_string(),
        };
        let err = envelope.decode::<Health>("/healthz").unwrap_err();
        assert!(err.message.contains("/healthz"));
        assert_eq!(err.status, None);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
    }
}
