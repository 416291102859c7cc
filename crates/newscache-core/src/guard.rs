//! Per-key guard allowing at most one remote fetch in flight.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

/// Observable state of one resource key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
}

/// Tracks which keys currently have a fetch in progress.
///
/// `try_begin` is a single check-and-set under the lock, so among any number
/// of concurrent callers exactly one wins until `end` is called. Losers are
/// not queued: they get `false` and must not start a fetch of their own.
#[derive(Debug, Default)]
pub struct LoadGuard {
    loading: Mutex<HashSet<String>>,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `key` from `Idle` to `Loading`. Returns `false`, changing
    /// nothing, if it was already `Loading`.
    pub fn try_begin(&self, key: &str) -> bool {
        let began = self.lock().insert(key.to_string());
        if !began {
            debug!(key, "Load already in progress");
        }
        began
    }

    /// Return `key` to `Idle`. Ending an idle key is a no-op.
    pub fn end(&self, key: &str) {
        self.lock().remove(key);
    }

    /// `try_begin` wrapped in a permit that calls `end` when dropped, so the
    /// key is released even if the fetch panics.
    pub fn begin(&self, key: &str) -> Option<LoadPermit<'_>> {
        self.try_begin(key).then(|| LoadPermit {
            guard: self,
            key: key.to_string(),
        })
    }

    pub fn state(&self, key: &str) -> LoadState {
        if self.lock().contains(key) {
            LoadState::Loading
        } else {
            LoadState::Idle
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked
        self.loading.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Proof of owning the in-flight fetch for one key.
#[derive(Debug)]
pub struct LoadPermit<'a> {
    guard: &'a LoadGuard,
    key: String,
}

impl LoadPermit<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LoadPermit<'_> {
    fn drop(&mut self) {
        self.guard.end(&self.key);
    }
}
