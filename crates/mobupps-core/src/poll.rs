//! Metrics polling.
//!
//! [`PollController`] is the synchronous state machine: it decides whether a
//! fetch may start, issues request tokens and commits only the newest result.
//! [`spawn`] drives it from a single tokio task that owns the refresh timer,
//! the in-flight fetches and the command channel, so there is exactly one
//! logical thread of execution touching poll state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use mobupps_types::{MetricsSnapshot, RefreshInterval};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::metrics::MetricsSource;
use crate::state::{LatestSlot, RequestToken, RequestTracker};
use crate::utils::export_file_name;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Manual refresh, nothing running
    Idle,
    /// A refresh timer is armed, nothing running
    Scheduled,
    /// At least one fetch is in flight
    Fetching,
}

/// What asked for a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    Tick,
    Manual,
}

/// Result of finishing a fetch
#[derive(Debug)]
pub enum PollEvent {
    Committed,
    Failed(Error),
    /// A newer request was issued before this one resolved
    Discarded,
}

/// Refresh cadence and request freshness for the metrics resource
#[derive(Debug)]
pub struct PollController {
    interval: RefreshInterval,
    tracker: RequestTracker,
    latest: LatestSlot<MetricsSnapshot>,
    in_flight: usize,
    pending_refetch: bool,
}

impl PollController {
    #[must_use]
    pub fn new(interval: RefreshInterval) -> Self {
        let tracker = RequestTracker::new();
        Self {
            interval,
            latest: LatestSlot::new(tracker.clone()),
            tracker,
            in_flight: 0,
            pending_refetch: false,
        }
    }

    #[must_use]
    pub fn interval(&self) -> RefreshInterval {
        self.interval
    }

    #[must_use]
    pub fn phase(&self) -> PollPhase {
        if self.in_flight > 0 {
            PollPhase::Fetching
        } else if self.interval.period().is_some() {
            PollPhase::Scheduled
        } else {
            PollPhase::Idle
        }
    }

    /// Change the cadence. Returns `true` when it actually changed, in which
    /// case the caller must re-arm its timer. A queued tick refetch is
    /// dropped along with the old timer.
    pub fn set_interval(&mut self, interval: RefreshInterval) -> bool {
        if interval == self.interval {
            return false;
        }
        info!("Metrics refresh interval: {} -> {interval}", self.interval);
        self.interval = interval;
        self.pending_refetch = false;
        true
    }

    /// Ask to start a fetch. Ticks that arrive while a fetch is running are
    /// coalesced into one refetch after it completes; manual refreshes always
    /// start.
    pub fn begin(&mut self, origin: FetchOrigin) -> Option<RequestToken> {
        if origin == FetchOrigin::Tick && self.in_flight > 0 {
            debug!("Metrics fetch in flight, coalescing tick");
            self.pending_refetch = true;
            return None;
        }
        self.in_flight += 1;
        let token = self.tracker.issue();
        debug!("Fetching metrics {token} ({origin:?})");
        Some(token)
    }

    /// Record the outcome of the fetch identified by `token`.
    pub fn finish(&mut self, token: RequestToken, outcome: Result<MetricsSnapshot>) -> PollEvent {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome {
            Ok(snapshot) => {
                if self.latest.commit(token, snapshot) {
                    PollEvent::Committed
                } else {
                    PollEvent::Discarded
                }
            }
            Err(e) if self.tracker.is_latest(token) => PollEvent::Failed(e),
            Err(e) => {
                debug!("Ignoring failure of stale metrics fetch {token}: {e}");
                PollEvent::Discarded
            }
        }
    }

    /// Whether a coalesced tick should be fetched now. Clears the request.
    pub fn take_pending_refetch(&mut self) -> bool {
        if self.in_flight == 0 && self.pending_refetch {
            self.pending_refetch = false;
            return true;
        }
        false
    }

    /// Latest committed snapshot
    #[must_use]
    pub fn latest(&self) -> Option<&MetricsSnapshot> {
        self.latest.get()
    }

    #[must_use]
    pub fn latest_token(&self) -> Option<RequestToken> {
        self.latest.token()
    }
}

/// Write `snapshot` as pretty JSON to a timestamped file in `dir`.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn export_snapshot(snapshot: &MetricsSnapshot, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(Utc::now()));
    let content = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, content)?;
    info!("Exported metrics to {}", path.display());
    Ok(path)
}

/// Requests sent to the poll task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCommand {
    SetInterval(RefreshInterval),
    Refresh,
    Stop,
}

/// Notifications from the poll task
#[derive(Debug)]
pub enum PollUpdate {
    Committed {
        token: RequestToken,
        snapshot: MetricsSnapshot,
    },
    Failed {
        token: RequestToken,
        error: Error,
    },
    Discarded {
        token: RequestToken,
    },
}

/// Handle to a running poll task. Dropping it stops the task.
#[derive(Debug)]
pub struct PollHandle {
    commands: mpsc::UnboundedSender<PollCommand>,
    snapshots: watch::Receiver<Option<MetricsSnapshot>>,
    updates: mpsc::UnboundedReceiver<PollUpdate>,
}

impl PollHandle {
    pub fn set_interval(&self, interval: RefreshInterval) {
        let _ = self.commands.send(PollCommand::SetInterval(interval));
    }

    pub fn refresh(&self) {
        let _ = self.commands.send(PollCommand::Refresh);
    }

    pub fn stop(&self) {
        let _ = self.commands.send(PollCommand::Stop);
    }

    /// Latest committed snapshot, without waiting for the network.
    #[must_use]
    pub fn latest(&self) -> Option<MetricsSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes whenever a new snapshot is committed.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<Option<MetricsSnapshot>> {
        self.snapshots.clone()
    }

    /// Next update from the poll task, or `None` once it has stopped.
    pub async fn next_update(&mut self) -> Option<PollUpdate> {
        self.updates.recv().await
    }

    /// Update already delivered by the poll task, if any.
    pub fn try_next_update(&mut self) -> Option<PollUpdate> {
        self.updates.try_recv().ok()
    }

    /// Export the latest snapshot to `dir`. Returns `None` when nothing has
    /// resolved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the export file cannot be written.
    pub fn export(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(snapshot) = self.latest() else {
            return Ok(None);
        };
        export_snapshot(&snapshot, dir).map(Some)
    }
}

type Fetch = BoxFuture<'static, (RequestToken, Result<MetricsSnapshot>)>;

/// Start polling `source`. An initial fetch is issued immediately, as when the
/// metrics view opens.
pub fn spawn<S>(source: S, interval: RefreshInterval) -> (PollHandle, JoinHandle<()>)
where
    S: MetricsSource + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(None);
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(run(
        Arc::new(source),
        PollController::new(interval),
        command_rx,
        snapshot_tx,
        update_tx,
    ));

    let handle = PollHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        updates: update_rx,
    };
    (handle, task)
}

async fn run<S: MetricsSource + 'static>(
    source: Arc<S>,
    mut controller: PollController,
    mut commands: mpsc::UnboundedReceiver<PollCommand>,
    snapshots: watch::Sender<Option<MetricsSnapshot>>,
    updates: mpsc::UnboundedSender<PollUpdate>,
) {
    let mut ticker = arm_ticker(controller.interval());
    let mut fetches: FuturesUnordered<Fetch> = FuturesUnordered::new();

    start_fetch(&mut controller, &mut fetches, &source, FetchOrigin::Manual);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None | Some(PollCommand::Stop) => break,
                Some(PollCommand::SetInterval(interval)) => {
                    if controller.set_interval(interval) {
                        ticker = arm_ticker(interval);
                    }
                }
                Some(PollCommand::Refresh) => {
                    start_fetch(&mut controller, &mut fetches, &source, FetchOrigin::Manual);
                }
            },
            () = next_tick(&mut ticker) => {
                start_fetch(&mut controller, &mut fetches, &source, FetchOrigin::Tick);
            }
            Some((token, outcome)) = fetches.next(), if !fetches.is_empty() => {
                let update = match controller.finish(token, outcome) {
                    PollEvent::Committed => {
                        let snapshot = controller.latest().cloned().unwrap_or_default();
                        snapshots.send_replace(Some(snapshot.clone()));
                        PollUpdate::Committed { token, snapshot }
                    }
                    PollEvent::Failed(error) => {
                        warn!("Metrics fetch {token} failed: {error}");
                        PollUpdate::Failed { token, error }
                    }
                    PollEvent::Discarded => PollUpdate::Discarded { token },
                };
                let _ = updates.send(update);

                if controller.take_pending_refetch() {
                    start_fetch(&mut controller, &mut fetches, &source, FetchOrigin::Tick);
                }
            }
        }
    }

    debug!(
        "Metrics polling stopped with {} fetches abandoned",
        fetches.len()
    );
}

fn start_fetch<S: MetricsSource + 'static>(
    controller: &mut PollController,
    fetches: &mut FuturesUnordered<Fetch>,
    source: &Arc<S>,
    origin: FetchOrigin,
) {
    let Some(token) = controller.begin(origin) else {
        return;
    };
    let source = Arc::clone(source);
    fetches.push(Box::pin(async move { (token, source.fetch().await) }));
}

/// Timer for `interval`; the first tick fires one full period from now.
fn arm_ticker(interval: RefreshInterval) -> Option<Interval> {
    interval.period().map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    })
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
