//! Request freshness and loading state shared by the orchestrators.
//!
//! Every asynchronous call is tagged with a [`RequestToken`] drawn from a
//! per-resource [`RequestTracker`]. A result may only be committed to display
//! state while its token is still the newest one issued, so a slow early
//! request can never overwrite the result of a later one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::debug;

/// Monotonically increasing id of one request for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues request tokens for one resource. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: Arc<AtomicU64>,
}

impl RequestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token. The first token is `#1`.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Highest token issued so far.
    #[must_use]
    pub fn latest(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }

    #[must_use]
    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

/// A value produced by the request identified by `token`
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub token: RequestToken,
    pub value: T,
}

impl<T> Tagged<T> {
    pub fn new(token: RequestToken, value: T) -> Self {
        Self { token, value }
    }
}

/// Display state for one resource: holds the last committed value.
#[derive(Debug, Clone)]
pub struct LatestSlot<T> {
    tracker: RequestTracker,
    committed: Option<(RequestToken, T)>,
}

impl<T> LatestSlot<T> {
    #[must_use]
    pub fn new(tracker: RequestTracker) -> Self {
        Self {
            tracker,
            committed: None,
        }
    }

    /// Commit `value` if `token` is still the newest issued token.
    ///
    /// Returns `false` and leaves the slot untouched for stale results.
    pub fn commit(&mut self, token: RequestToken, value: T) -> bool {
        if !self.tracker.is_latest(token) {
            debug!(
                "Discarding stale result {token} (latest issued: {:?})",
                self.tracker.latest()
            );
            return false;
        }
        self.committed = Some((token, value));
        true
    }

    /// Commit a tagged outcome. Failures leave the slot untouched and are
    /// handed back to the caller.
    ///
    /// # Errors
    ///
    /// Returns the request's own error when it failed.
    pub fn apply<E>(&mut self, tagged: Tagged<Result<T, E>>) -> Result<bool, E> {
        let Tagged { token, value } = tagged;
        Ok(self.commit(token, value?))
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.committed.as_ref().map(|(_, value)| value)
    }

    #[must_use]
    pub fn token(&self) -> Option<RequestToken> {
        self.committed.as_ref().map(|(token, _)| *token)
    }

    #[must_use]
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }
}

/// Loading indicator that is raised while at least one call is running.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag {
    active: Arc<AtomicUsize>,
}

impl LoadingFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag until the returned guard is dropped.
    #[must_use = "the flag is lowered as soon as the guard is dropped"]
    pub fn begin(&self) -> LoadingGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        LoadingGuard {
            active: Arc::clone(&self.active),
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
}

/// Lowers its [`LoadingFlag`] on drop, whether the call succeeded, failed or
/// was cancelled.
#[derive(Debug)]
pub struct LoadingGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
