//! Bounded search history.
//!
//! History is a newest-first list of at most [`HISTORY_LIMIT`] entries kept in
//! a [`HistoryStore`]. Stores are read-modify-written without a lock; only one
//! writer (one active dashboard) is expected at a time.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mobupps_types::{AppDescriptor, HistoryEntry};
use tracing::{debug, warn};

use crate::Result;

/// Maximum number of remembered searches
pub const HISTORY_LIMIT: usize = 10;

/// Where search history lives
pub trait HistoryStore: Send + Sync {
    /// Stored entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn read(&self) -> Result<Vec<HistoryEntry>>;

    /// Replace the stored entries wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn write(&self, entries: &[HistoryEntry]) -> Result<()>;
}

/// Put `app` at the front of the history and evict anything past the limit.
///
/// Returns the list as written.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn record<S: HistoryStore + ?Sized>(
    store: &S,
    app: AppDescriptor,
    timestamp: String,
) -> Result<Vec<HistoryEntry>> {
    let mut entries = store.read()?;
    entries.insert(0, HistoryEntry { app, timestamp });
    entries.truncate(HISTORY_LIMIT);
    store.write(&entries)?;
    Ok(entries)
}

/// Forget every remembered search.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn clear<S: HistoryStore + ?Sized>(store: &S) -> Result<()> {
    store.write(&[])
}

impl<S: HistoryStore + ?Sized> HistoryStore for Arc<S> {
    fn read(&self) -> Result<Vec<HistoryEntry>> {
        (**self).read()
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        (**self).write(entries)
    }
}

impl<S: HistoryStore + ?Sized> HistoryStore for &S {
    fn read(&self) -> Result<Vec<HistoryEntry>> {
        (**self).read()
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        (**self).write(entries)
    }
}

/// In-process history, used by tests and short-lived sessions
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn read(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(entries.clone())
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        let mut stored = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *stored = entries.to_vec();
        Ok(())
    }
}

/// History persisted as one JSON array in a file
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileHistory {
    fn read(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            debug!("Search history not found at {}", self.path.display());
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut entries: Vec<HistoryEntry> = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Failed to parse search history: {} (at line {}, column {})",
                    e,
                    e.line(),
                    e.column()
                );
                return Ok(Vec::new());
            }
        };
        entries.truncate(HISTORY_LIMIT);
        Ok(entries)
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(entries)?;
        std::fs::write(&self.path, content)?;
        debug!("Saved {} search history entries", entries.len());
        Ok(())
    }
}
