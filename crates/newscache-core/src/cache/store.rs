use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{CachePolicy, Clock, Freshness, PersistenceError, SystemClock};
use crate::models::ContentItem;
use crate::utils::{format_age, format_bytes};

/// Snapshot layout version. Bump whenever `ContentItem` changes shape;
/// snapshots written under another version are discarded on read.
pub const SCHEMA_VERSION: u32 = 1;

/// Counter for unique temp file names within this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The persisted state of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub schema_version: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
    /// In the order the remote source returned them.
    pub items: Vec<ContentItem>,
}

impl CacheSnapshot {
    /// Age relative to `now`, never negative.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.captured_at).max(Duration::zero())
    }
}

/// Just enough of a snapshot file to check its version.
#[derive(Debug, Deserialize)]
struct SnapshotHeader {
    #[serde(default)]
    schema_version: u32,
}

/// Summary of one collection's cache for diagnostics screens.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub available: bool,
    pub item_count: usize,
    pub captured_at: Option<DateTime<Utc>>,
    pub age: Option<Duration>,
    pub size_bytes: u64,
    pub freshness: Option<Freshness>,
}

impl CacheStats {
    fn unavailable() -> Self {
        Self {
            available: false,
            item_count: 0,
            captured_at: None,
            age: None,
            size_bytes: 0,
            freshness: None,
        }
    }

    pub fn age_display(&self) -> String {
        self.age.map(format_age).unwrap_or_else(|| "never".to_string())
    }

    pub fn size_display(&self) -> String {
        format_bytes(self.size_bytes)
    }
}

/// Durable store holding one snapshot per collection key.
///
/// Each key maps to `<cache_dir>/<key>.json`. Writes go to a temp file in the
/// same directory and are renamed over the old snapshot, so a reader sees
/// either the previous snapshot or the new one, never a mix.
pub struct CacheStore {
    cache_dir: PathBuf,
    schema_version: u32,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(&cache_dir).map_err(|e| PersistenceError::io(&cache_dir, e))?;
        Ok(Self {
            cache_dir,
            schema_version: SCHEMA_VERSION,
            policy: CachePolicy::default(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the expected layout version. Mostly useful for simulating an
    /// upgraded build against snapshots written by an older one.
    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Read the snapshot for `key` and classify its age.
    ///
    /// A snapshot from another schema version is deleted and reported as
    /// absent.
    pub fn read(&self, key: &str) -> Result<Option<(CacheSnapshot, Freshness)>, PersistenceError> {
        let Some(bytes) = self.read_bytes(key)? else {
            debug!(key, "No cached snapshot");
            return Ok(None);
        };

        let header = Self::parse_header(key, &bytes)?;
        if header.schema_version != self.schema_version {
            warn!(
                key,
                found = header.schema_version,
                expected = self.schema_version,
                "Cache schema version changed, clearing snapshot"
            );
            self.clear(key)?;
            return Ok(None);
        }

        let snapshot: CacheSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Parse {
                key: key.to_string(),
                source,
            })?;
        let freshness = self.policy.classify(snapshot.age_at(self.clock.now()));

        debug!(key, count = snapshot.items.len(), %freshness, "Cache snapshot loaded");
        Ok(Some((snapshot, freshness)))
    }

    /// Replace the snapshot for `key` with `items`, stamped now.
    ///
    /// All-or-nothing: on any error the previous snapshot is left as it was.
    pub fn write(&self, key: &str, items: &[ContentItem]) -> Result<(), PersistenceError> {
        let path = self.snapshot_path(key)?;
        let snapshot = CacheSnapshot {
            schema_version: self.schema_version,
            captured_at: self.clock.now(),
            items: items.to_vec(),
        };
        let contents = serde_json::to_vec_pretty(&snapshot).map_err(PersistenceError::Serialize)?;

        let tmp_path = self.cache_dir.join(format!(
            ".{}.{}.{}.tmp",
            key,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = Self::write_synced(&tmp_path, &contents) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(PersistenceError::io(&tmp_path, e));
        }
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(PersistenceError::io(&path, e));
        }

        info!(key, count = items.len(), bytes = contents.len(), "Cache snapshot saved");
        Ok(())
    }

    /// Remove the snapshot for `key`. Clearing a missing snapshot is fine.
    pub fn clear(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.snapshot_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(key, "Cache snapshot cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io(&path, e)),
        }
    }

    /// Size of the stored snapshot in bytes, 0 when there is none.
    pub fn size_bytes(&self, key: &str) -> u64 {
        self.snapshot_path(key)
            .ok()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    /// Age of the current snapshot, if there is one `read` would accept.
    /// Never modifies the store.
    pub fn age(&self, key: &str) -> Option<Duration> {
        match self.load_matching(key) {
            Ok(snapshot) => snapshot.map(|s| s.age_at(self.clock.now())),
            Err(e) => {
                debug!(key, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    /// Human readable age, `"never"` when nothing usable is cached.
    pub fn age_display(&self, key: &str) -> String {
        self.age(key)
            .map(format_age)
            .unwrap_or_else(|| "never".to_string())
    }

    /// Everything a diagnostics screen wants to know about `key`, without
    /// side effects.
    pub fn stats(&self, key: &str) -> CacheStats {
        let snapshot = match self.load_matching(key) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return CacheStats::unavailable(),
            Err(e) => {
                debug!(key, error = %e, "Failed to load cache for stats");
                return CacheStats::unavailable();
            }
        };
        let age = snapshot.age_at(self.clock.now());
        CacheStats {
            available: true,
            item_count: snapshot.items.len(),
            captured_at: Some(snapshot.captured_at),
            age: Some(age),
            size_bytes: self.size_bytes(key),
            freshness: Some(self.policy.classify(age)),
        }
    }

    fn load_matching(&self, key: &str) -> Result<Option<CacheSnapshot>, PersistenceError> {
        let Some(bytes) = self.read_bytes(key)? else {
            return Ok(None);
        };
        if Self::parse_header(key, &bytes)?.schema_version != self.schema_version {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistenceError::Parse {
                key: key.to_string(),
                source,
            })
    }

    fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.snapshot_path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io(&path, e)),
        }
    }

    fn parse_header(key: &str, bytes: &[u8]) -> Result<SnapshotHeader, PersistenceError> {
        serde_json::from_slice(bytes).map_err(|source| PersistenceError::Parse {
            key: key.to_string(),
            source,
        })
    }

    fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }

    /// Keys become file names, so only a conservative character set is allowed.
    fn snapshot_path(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.cache_dir.join(format!("{}.json", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::geo::Coordinates;
    use tempfile::TempDir;

    fn items() -> Vec<ContentItem> {
        vec![
            ContentItem::new("n-1")
                .with_coordinates(Coordinates {
                    latitude: 0.35,
                    longitude: -78.12,
                })
                .with_field("title", "Mercado nocturno"),
            ContentItem::new("n-2").with_field("title", "Corte de agua"),
        ]
    }

    fn store_with_clock(dir: &TempDir) -> (CacheStore, Arc<ManualClock>) {
        // Whole milliseconds, matching the on-disk timestamp precision
        let start = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = CacheStore::new(dir.path().to_path_buf())
            .unwrap()
            .with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn test_write_then_read_is_fresh() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);

        store.write("news", &items()).unwrap();
        let (snapshot, freshness) = store.read("news").unwrap().unwrap();

        assert_eq!(snapshot.items, items());
        assert_eq!(snapshot.schema_version, SCHEMA_VERSION);
        assert_eq!(freshness, Freshness::Fresh);
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        assert!(store.read("events").unwrap().is_none());
        assert_eq!(store.age("events"), None);
        assert_eq!(store.size_bytes("events"), 0);
        assert_eq!(store.age_display("events"), "never");
    }

    #[test]
    fn test_freshness_follows_elapsed_time() {
        let dir = TempDir::new().unwrap();
        let (store, clock) = store_with_clock(&dir);
        store.write("news", &items()).unwrap();

        clock.advance(Duration::minutes(6));
        assert_eq!(store.read("news").unwrap().unwrap().1, Freshness::Stale);

        clock.advance(Duration::hours(25));
        let (snapshot, freshness) = store.read("news").unwrap().unwrap();
        assert_eq!(freshness, Freshness::Expired);
        assert_eq!(snapshot.items.len(), 2);
    }

    #[test]
    fn test_write_replaces_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let (store, clock) = store_with_clock(&dir);
        store.write("news", &items()).unwrap();
        clock.advance(Duration::hours(2));

        let replacement = vec![ContentItem::new("n-9")];
        store.write("news", &replacement).unwrap();

        let (snapshot, freshness) = store.read("news").unwrap().unwrap();
        assert_eq!(snapshot.items, replacement);
        assert_eq!(freshness, Freshness::Fresh);
    }

    #[test]
    fn test_empty_list_is_a_valid_snapshot() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        store.write("events", &[]).unwrap();
        let (snapshot, _) = store.read("events").unwrap().unwrap();
        assert!(snapshot.items.is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        store.write("news", &items()).unwrap();
        store.write("events", &[ContentItem::new("e-1")]).unwrap();
        store.clear("news").unwrap();

        assert!(store.read("news").unwrap().is_none());
        assert_eq!(store.read("events").unwrap().unwrap().0.items.len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        store.write("news", &items()).unwrap();
        store.clear("news").unwrap();
        store.clear("news").unwrap();
        assert!(store.read("news").unwrap().is_none());
    }

    #[test]
    fn test_schema_change_clears_snapshot() {
        let dir = TempDir::new().unwrap();
        let v1 = CacheStore::new(dir.path().to_path_buf())
            .unwrap()
            .with_schema_version(1);
        v1.write("news", &items()).unwrap();

        let v2 = CacheStore::new(dir.path().to_path_buf())
            .unwrap()
            .with_schema_version(2);
        assert_eq!(v2.age("news"), None);
        assert!(!v2.stats("news").available);
        // Introspection must not have removed the file
        assert!(v2.size_bytes("news") > 0);

        assert!(v2.read("news").unwrap().is_none());
        assert_eq!(v2.size_bytes("news"), 0);
        assert!(v2.read("news").unwrap().is_none());
        assert!(v1.read("news").unwrap().is_none());
    }

    #[test]
    fn test_unversioned_file_is_cleared() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        std::fs::write(dir.path().join("news.json"), r#"{"items": []}"#).unwrap();

        assert!(store.read("news").unwrap().is_none());
        assert!(!dir.path().join("news.json").exists());
    }

    #[test]
    fn test_corrupt_file_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        std::fs::write(dir.path().join("news.json"), b"{not json").unwrap();

        assert!(matches!(
            store.read("news"),
            Err(PersistenceError::Parse { .. })
        ));
        assert_eq!(store.age("news"), None);
    }

    #[test]
    fn test_undecodable_items_report_no_age() {
        let dir = TempDir::new().unwrap();
        let (store, clock) = store_with_clock(&dir);
        let body = format!(
            r#"{{"schema_version": {}, "captured_at": {}, "items": [{{"title": "no id"}}]}}"#,
            SCHEMA_VERSION,
            clock.now().timestamp_millis()
        );
        std::fs::write(dir.path().join("news.json"), body).unwrap();

        assert!(matches!(
            store.read("news"),
            Err(PersistenceError::Parse { .. })
        ));
        assert_eq!(store.age("news"), None);
        assert_eq!(store.age_display("news"), "never");
        assert!(!store.stats("news").available);
    }

    #[test]
    fn test_failed_write_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        store.write("news", &items()).unwrap();

        // A directory squatting on the target path makes the rename fail
        std::fs::create_dir(dir.path().join("events.json")).unwrap();
        assert!(matches!(
            store.write("events", &items()),
            Err(PersistenceError::Io { .. })
        ));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(store.read("news").unwrap().unwrap().0.items, items());
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_with_clock(&dir);
        for key in ["", "../escape", "a/b", "news.json"] {
            assert!(matches!(
                store.write(key, &items()),
                Err(PersistenceError::InvalidKey(_))
            ));
        }
        assert_eq!(store.size_bytes("../escape"), 0);
    }

    #[test]
    fn test_age_and_stats() {
        let dir = TempDir::new().unwrap();
        let (store, clock) = store_with_clock(&dir);
        store.write("news", &items()).unwrap();
        clock.advance(Duration::minutes(42));

        assert_eq!(store.age("news"), Some(Duration::minutes(42)));
        assert_eq!(store.age_display("news"), "42m ago");

        let stats = store.stats("news");
        assert!(stats.available);
        assert_eq!(stats.item_count, 2);
        assert_eq!(stats.freshness, Some(Freshness::Stale));
        assert_eq!(stats.size_bytes, store.size_bytes("news"));
        assert!(stats.size_bytes > 0);
        assert_eq!(stats.age_display(), "42m ago");
        assert!(stats.size_display().ends_with('B'));
    }

    #[test]
    fn test_captured_at_is_epoch_millis() {
        let dir = TempDir::new().unwrap();
        let (store, clock) = store_with_clock(&dir);
        store.write("news", &items()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("news.json")).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], SCHEMA_VERSION);
        assert_eq!(raw["captured_at"], clock.now().timestamp_millis());
    }
}
