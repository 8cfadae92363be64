//! Backend liveness probe.

use mobupps_client::{Transport, api};
use mobupps_types::HealthStatus;
use tracing::{debug, warn};

use crate::Result;

/// Probe `/healthz` once.
///
/// # Errors
///
/// Returns a network error when the backend is unreachable or replies with
/// something other than a health document.
pub async fn check<T: Transport>(transport: &T) -> Result<HealthStatus> {
    let reply = api::health(transport).await?;
    debug!(
        "Backend {} after {:.0}s [cid:{}]",
        reply.data.status, reply.data.uptime_seconds, reply.correlation_id
    );
    Ok(reply.data)
}

/// Probe `/healthz`, treating failure as an unknown status.
pub async fn probe<T: Transport>(transport: &T) -> Option<HealthStatus> {
    match check(transport).await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!("Health check failed: {e}");
            None
        }
    }
}
