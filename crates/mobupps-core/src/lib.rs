pub mod config;
pub mod health;
pub mod history;
pub mod metrics;
pub mod notice;
pub mod poll;
pub mod predict;
pub mod search;
pub mod state;

mod error;
mod utils;

#[cfg(test)]
mod tests;

pub use config::{Config, Directories};
pub use error::{Error, Result};
pub use history::{FileHistory, HISTORY_LIMIT, HistoryStore, MemoryHistory};
pub use metrics::{BackendMetrics, MetricsSource, normalize};
pub use notice::{Notice, NoticeLevel};
pub use poll::{PollController, PollHandle, PollUpdate};
pub use predict::{PredictForm, PredictOrchestrator};
pub use search::{SearchForm, SearchOrchestrator, TopK};
pub use state::{LatestSlot, LoadingFlag, RequestToken, RequestTracker, Tagged};

pub use mobupps_types::*;
