//! Local caching module for offline content access.
//!
//! This module provides the `CacheStore`, which keeps the most recent
//! snapshot of each content collection ("news", "events", ...) on disk as
//! JSON. Snapshots are classified as fresh (under 5 minutes), stale (under
//! 24 hours) or expired, and are discarded when the snapshot layout version
//! changes.

pub mod clock;
pub mod error;
pub mod freshness;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::PersistenceError;
pub use freshness::{CachePolicy, Freshness};
pub use store::{CacheSnapshot, CacheStats, CacheStore, SCHEMA_VERSION};
