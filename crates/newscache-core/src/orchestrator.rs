//! Cache-backed fetching: the single entry point screens call for content.
//!
//! Each `get_content` call plays one of three roles:
//!
//! - `NoFetchNeeded`: the snapshot is fresh, serve it.
//! - `FetchOwner`: no fresh snapshot and the guard was free, so this call
//!   fetches, saves and serves the remote result (or falls back to the cache
//!   when the fetch fails).
//! - `FetchWaiter`: another call already owns the fetch for this key, so this
//!   one serves whatever is cached right now without waiting.
//!
//! Whatever the role, the caller gets a ranked list. Network and storage
//! trouble only ever makes that list older or empty.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::api::RemoteSource;
use crate::cache::{CacheStats, CacheStore, Freshness};
use crate::error::Result;
use crate::geo::{rank, within_radius, Coordinates};
use crate::guard::LoadGuard;
use crate::models::ContentItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchRole {
    NoFetchNeeded,
    FetchOwner,
    FetchWaiter,
}

/// Serves content from the local cache, refreshing it from the remote source
/// when it is no longer fresh.
///
/// Share one store and one guard per process; clone the `Arc`s into every
/// service that needs them.
pub struct ContentService<R> {
    store: Arc<CacheStore>,
    guard: Arc<LoadGuard>,
    remote: R,
}

impl<R: RemoteSource> ContentService<R> {
    pub fn new(store: Arc<CacheStore>, guard: Arc<LoadGuard>, remote: R) -> Self {
        Self {
            store,
            guard,
            remote,
        }
    }

    /// Best available items for `key`, nearest first when an observer is
    /// given.
    ///
    /// Fails only for an invalid observer position.
    pub async fn get_content(
        &self,
        key: &str,
        observer: Option<Coordinates>,
    ) -> Result<Vec<ContentItem>> {
        if let Some(observer) = observer {
            observer.validate()?;
        }
        let items = sanitize_coordinates(key, self.load(key).await);
        Ok(rank(&items, observer))
    }

    /// Like `get_content`, keeping only items within `radius_km` of the
    /// observer.
    pub async fn get_content_within(
        &self,
        key: &str,
        observer: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<ContentItem>> {
        observer.validate()?;
        let items = sanitize_coordinates(key, self.load(key).await);
        let nearby = within_radius(&items, observer, radius_km);
        debug!(key, radius_km, kept = nearby.len(), total = items.len(), "Radius filter applied");
        Ok(nearby)
    }

    /// How long ago the cached snapshot for `key` was taken.
    pub fn age(&self, key: &str) -> Option<Duration> {
        self.store.age(key)
    }

    /// `"5m ago"` style label, `"never"` without a snapshot.
    pub fn age_display(&self, key: &str) -> String {
        self.store.age_display(key)
    }

    pub fn size_bytes(&self, key: &str) -> u64 {
        self.store.size_bytes(key)
    }

    pub fn stats(&self, key: &str) -> CacheStats {
        self.store.stats(key)
    }

    /// Drop the cached snapshot so the next request goes to the remote source.
    pub fn clear(&self, key: &str) -> Result<()> {
        self.store.clear(key)?;
        Ok(())
    }

    /// Unranked best-available items. Never fails.
    async fn load(&self, key: &str) -> Vec<ContentItem> {
        let cached = match self.store.read(key) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(key, error = %e, "Cache unreadable, treating as empty");
                None
            }
        };

        let (fallback, freshness) = match cached {
            Some((snapshot, freshness)) => (snapshot.items, Some(freshness)),
            None => (Vec::new(), None),
        };

        if freshness == Some(Freshness::Fresh) {
            debug!(key, role = ?FetchRole::NoFetchNeeded, count = fallback.len(), "Serving fresh cache");
            return fallback;
        }

        let Some(_permit) = self.guard.begin(key) else {
            debug!(key, role = ?FetchRole::FetchWaiter, count = fallback.len(), "Fetch in flight, serving cache");
            return fallback;
        };

        debug!(key, role = ?FetchRole::FetchOwner, ?freshness, "Fetching from remote");
        match self.remote.fetch(key).await {
            Ok(items) => {
                info!(key, count = items.len(), "Remote fetch succeeded");
                if let Err(e) = self.store.write(key, &items) {
                    warn!(key, error = %e, "Failed to save snapshot, serving uncached result");
                }
                items
            }
            Err(e) => {
                warn!(key, error = %e, fallback = fallback.len(), "Remote fetch failed, serving cache");
                fallback
            }
        }
    }
}

/// Out-of-range item coordinates are bad data from the source, not a caller
/// bug: drop them so ranking treats the item as unlocated.
fn sanitize_coordinates(key: &str, mut items: Vec<ContentItem>) -> Vec<ContentItem> {
    for item in items.iter_mut() {
        if let Some(coords) = item.coordinates {
            if !coords.is_valid() {
                warn!(key, id = %item.id, %coords, "Ignoring invalid item coordinates");
                item.coordinates = None;
            }
        }
    }
    items
}
