//! Typed calls for each backend endpoint.

use mobupps_types::HealthStatus;

use crate::error::Result;
use crate::protocol::{
    FIND_SIMILAR_PATH, HEALTH_PATH, METRICS_PATH, PREDICT_PATH, PredictReply, PredictRequest,
    RawMetrics, SearchReply, SearchRequest,
};
use crate::transport::{Decoded, Method, Transport};

/// `GET /healthz`
///
/// # Errors
///
/// Returns a `NetworkError` on transport failure, non-2xx status or an unexpected body.
pub async fn health<T: Transport>(transport: &T) -> Result<Decoded<HealthStatus>> {
    transport
        .call(Method::Get, HEALTH_PATH, None)
        .await?
        .decode(HEALTH_PATH)
}

/// `GET /metrics`
///
/// # Errors
///
/// Returns a `NetworkError` on transport failure, non-2xx status or an unexpected body.
pub async fn metrics<T: Transport>(transport: &T) -> Result<Decoded<RawMetrics>> {
    transport
        .call(Method::Get, METRICS_PATH, None)
        .await?
        .decode(METRICS_PATH)
}

/// `POST /api/v1/find-similar`
///
/// # Errors
///
/// Returns a `NetworkError` on transport failure, non-2xx status or an unexpected body.
pub async fn find_similar<T: Transport>(
    transport: &T,
    request: &SearchRequest,
) -> Result<Decoded<SearchReply>> {
    let body = serde_json::to_value(request)?;
    transport
        .call(Method::Post, FIND_SIMILAR_PATH, Some(body))
        .await?
        .decode(FIND_SIMILAR_PATH)
}

/// `POST /api/v1/predict`
///
/// # Errors
///
/// Returns a `NetworkError` on transport failure, non-2xx status or an unexpected body.
pub async fn predict<T: Transport>(
    transport: &T,
    request: &PredictRequest,
) -> Result<Decoded<PredictReply>> {
    let body = serde_json::to_value(request)?;
    transport
        .call(Method::Post, PREDICT_PATH, Some(body))
        .await?
        .decode(PREDICT_PATH)
}
