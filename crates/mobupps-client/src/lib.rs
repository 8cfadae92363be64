//! HTTP transport and wire protocol for the MobUpps API.
//!
//! # Architecture
//!
//! - [`transport`]: the [`Transport`] trait, [`Envelope`] and correlation ids
//! - [`client`]: reqwest-backed [`HttpClient`]
//! - [`protocol`]: request/reply shapes and endpoint paths
//! - [`api`]: one typed function per endpoint
//! - [`error`]: the single [`NetworkError`] every failure maps into
//!
//! # Example
//!
//! ```no_run
//! use mobupps_client::{HttpClient, api};
//!
//! # async fn example() -> Result<(), mobupps_client::NetworkError> {
//! let client = HttpClient::local()?;
//! let health = api::health(&client).await?;
//! println!("{} [cid:{}]", health.data.status, health.correlation_id);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpClient};
pub use error::{NetworkError, Result};
pub use protocol::{
    NeighborWire, PredictReply, PredictRequest, PredictionWire, RawMetrics, SearchFilters,
    SearchReply, SearchRequest,
};
pub use transport::{CORRELATION_HEADER, Decoded, Envelope, Method, Transport};
